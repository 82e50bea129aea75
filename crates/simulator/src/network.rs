//! Network files.
//!
//! A network is stored as TOML with one `[[nodes]]` table per site and one
//! `[[pairs]]` table per neighbour pair:
//!
//! ```toml
//! [[nodes]]
//! id = 0
//! position = { x = 0.0, y = 0.0, z = 0.0 }
//!
//! [[pairs]]
//! a = 0
//! b = 1
//! displacement = { x = 1.0, y = 0.0, z = 0.0 }
//! rate_ab = 1.0
//! rate_ba = 1.0
//! ```

use crate::SimulatorError;
use kmc_types::{GraphSource, LoadError, NodeId, NodeRecord, PairRecord, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Parsed contents of a network file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkFile {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,

    #[serde(default)]
    pub pairs: Vec<PairRecord>,
}

impl NetworkFile {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// A graph source backed by a TOML network file.
///
/// The file is read and parsed once, when the source is opened.
#[derive(Debug, Clone)]
pub struct TomlNetworkSource {
    path: PathBuf,
    file: NetworkFile,
}

impl TomlNetworkSource {
    /// Read and parse `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Source(format!("{}: {e}", path.display())))?;
        let file = NetworkFile::from_toml_str(&text)
            .map_err(|e| LoadError::Source(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphSource for TomlNetworkSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn node_records(&self) -> Result<Vec<NodeRecord>, LoadError> {
        Ok(self.file.nodes.clone())
    }

    fn pair_records(&self) -> Result<Vec<PairRecord>, LoadError> {
        Ok(self.file.pairs.clone())
    }
}

/// Parameters of a generated periodic simple cubic network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeSpec {
    /// Sites per box side.
    pub size: u64,

    /// Distance between neighbouring sites.
    pub spacing: f64,

    /// Mean hop rate.
    pub rate: f64,

    /// Relative spread of the rates: each direction of each pair draws its
    /// rate uniformly from `rate * [1 - disorder, 1 + disorder)`.
    pub disorder: f64,

    /// Seed for the rate draws.
    pub seed: u64,
}

impl Default for LatticeSpec {
    fn default() -> Self {
        Self {
            size: 10,
            spacing: 1.0,
            rate: 1.0,
            disorder: 0.0,
            seed: 0,
        }
    }
}

impl LatticeSpec {
    /// Generate the network.
    ///
    /// Site ids are `x + n*y + n²*z`. Every site is paired with its +x, +y
    /// and +z neighbours, wrapping at the box edge, so the box has `3n³`
    /// pairs.
    pub fn generate(&self) -> Result<NetworkFile, SimulatorError> {
        let invalid = |msg: String| Err(SimulatorError::InvalidConfig(msg));
        if self.size < 3 {
            return invalid(format!("lattice needs at least 3 sites per side, got {}", self.size));
        }
        if !(self.spacing > 0.0 && self.spacing.is_finite()) {
            return invalid(format!("lattice spacing must be positive, got {}", self.spacing));
        }
        if !(self.rate >= 0.0 && self.rate.is_finite()) {
            return invalid(format!("lattice rate must be non-negative, got {}", self.rate));
        }
        if !(0.0..1.0).contains(&self.disorder) {
            return invalid(format!("disorder must be in [0, 1), got {}", self.disorder));
        }

        let n = self.size;
        let id = |x: u64, y: u64, z: u64| NodeId(x + n * y + n * n * z);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut draw = || {
            if self.disorder == 0.0 {
                self.rate
            } else {
                self.rate * rng.gen_range(1.0 - self.disorder..1.0 + self.disorder)
            }
        };

        let mut file = NetworkFile::default();
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    file.nodes.push(NodeRecord {
                        id: id(x, y, z),
                        position: Vec3::new(x as f64, y as f64, z as f64) * self.spacing,
                    });
                }
            }
        }

        let axes = [
            Vec3::new(self.spacing, 0.0, 0.0),
            Vec3::new(0.0, self.spacing, 0.0),
            Vec3::new(0.0, 0.0, self.spacing),
        ];
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let neighbours = [
                        id((x + 1) % n, y, z),
                        id(x, (y + 1) % n, z),
                        id(x, y, (z + 1) % n),
                    ];
                    for (b, displacement) in neighbours.into_iter().zip(axes) {
                        file.pairs.push(PairRecord {
                            a: id(x, y, z),
                            b,
                            displacement,
                            rate_ab: draw(),
                            rate_ba: draw(),
                        });
                    }
                }
            }
        }

        info!(
            size = n,
            nodes = file.nodes.len(),
            pairs = file.pairs.len(),
            disorder = self.disorder,
            "Generated lattice"
        );
        Ok(file)
    }
}
