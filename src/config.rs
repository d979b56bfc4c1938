//! Global configuration consumed by the translator.
//!
//! The translator consults exactly the options listed here; there is no
//! free-form key/value store at this boundary. Each field corresponds to a
//! command-line switch of the surrounding compiler driver.

use serde::{Deserialize, Serialize};

/// Provenance flavours. `SubtreeHeights` carries one height column per body
/// atom, `Explain` a single height column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvenanceMode {
    Explain,
    SubtreeHeights,
}

/// Read-only option record for a single translation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Provenance-annotated evaluation: adds rule-number/height columns,
    /// gates subproof subroutines and subsumption checks.
    pub provenance: Option<ProvenanceMode>,
    /// Incremental maintenance: activates the diff-plus/diff-minus machinery.
    pub incremental: bool,
    /// Name of a communication engine, if any. Adds load/store/drop edges for
    /// external predecessor relations and routes intermediate I/O.
    pub engine: Option<String>,
    /// Compilation to an executable is requested.
    pub compile: bool,
    /// A Datalog program is compiled to a standalone binary.
    pub dl_program: bool,
    /// Source-to-source generation is requested.
    pub generate: bool,
    /// Insert frequency/timing log statements into the emitted program.
    pub profile: bool,
    /// Target directory for stores; the literal `-` switches output relations
    /// to stdout.
    pub output_dir: String,
    /// Source directory for `.facts` loads.
    pub fact_dir: String,
    /// Register a textual dump of the emitted RAM program.
    pub debug_report: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provenance: None,
            incremental: false,
            engine: None,
            compile: false,
            dl_program: false,
            generate: false,
            profile: false,
            output_dir: ".".to_string(),
            fact_dir: ".".to_string(),
            debug_report: false,
        }
    }
}

impl TranslatorConfig {
    pub fn provenance_enabled(&self) -> bool {
        self.provenance.is_some()
    }

    /// The interpreter deduplicates provenance tuples at insertion time; the
    /// compiled back-ends handle this themselves, so the dedup filter is
    /// skipped whenever any compilation path is active.
    pub fn skip_provenance_dedup(&self) -> bool {
        self.compile || self.dl_program || self.generate
    }

    pub fn engine_enabled(&self) -> bool {
        self.engine.is_some()
    }

    pub fn stdout_output(&self) -> bool {
        self.output_dir == "-"
    }
}
