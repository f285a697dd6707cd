use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Errors surfaced by the pipeline front end (cycles, non-affine
    /// indices).
    #[snafu(context(false))]
    #[snafu(display("{source}"))]
    Front { source: mosaic_ir::Error },

    /// The function has an update definition.
    #[snafu(display("update definitions are not yet supported by the auto-scheduler: \"{func}\""))]
    UpdateDefinitionsUnsupported { func: String },

    /// A scalar parameter used in an index expression has no estimate.
    #[snafu(display("missing estimate for parameter \"{name}\""))]
    MissingParamEstimate { name: String },

    /// An output function lacks a bounds estimate on some dimension.
    #[snafu(display("need an estimate on dimension {dim} of \"{func}\""))]
    MissingOutputEstimate { func: String, dim: usize },

    /// An estimate or bound that must be a constant is not.
    #[snafu(display("{context}: expected a constant bound, got {expr}"))]
    NonConstantBound { context: String, expr: String },
}
