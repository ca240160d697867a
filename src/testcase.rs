//! Test-case model and raw byte I/O
//!
//! A test case is the per-index value table fed to the evaluator. The first
//! one is the seed; auxiliaries loaded from a folder drive the reuse phase.
//! Value slots past the raw byte length belong to assignments and are
//! materialised eagerly when an assignment is registered.

use std::fs;
use std::io;
use std::path::Path;

/// Concrete value table for every input index known to a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testcase {
    /// Concrete value per index; plain bytes for the first `len` slots.
    pub values: Vec<u64>,
    /// Byte width of each value slot.
    pub value_sizes: Vec<u8>,
    /// Raw byte length of the backing file.
    pub len: usize,
}

impl Testcase {
    /// Build a test case from raw seed bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            values: bytes.iter().map(|&b| b as u64).collect(),
            value_sizes: vec![1; bytes.len()],
            len: bytes.len(),
        }
    }

    /// Load a test case from a raw byte file.
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::from_bytes(&fs::read(path)?))
    }

    /// Append a slot for an assignment with the given concrete value.
    pub fn push_assignment(&mut self, value: u64, size: u8) {
        self.values.push(value);
        self.value_sizes.push(size);
    }
}

/// Load every regular file of `folder` as an auxiliary test case, in
/// lexicographic order for reproducibility.
pub fn load_folder(folder: &Path) -> io::Result<Vec<Testcase>> {
    let mut paths: Vec<_> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    paths.iter().map(|p| Testcase::load(p)).collect()
}

/// Write a proof out as raw bytes.
pub fn dump_proof(path: &Path, proof: &[u8]) -> io::Result<()> {
    fs::write(path, proof)
}
