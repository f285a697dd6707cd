use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The pipeline's call graph is not a DAG.
    #[snafu(display("pipeline contains a cycle through \"{func}\""))]
    CyclicPipeline { func: String },

    /// A call appears inside an index expression, so the touched region
    /// cannot be bounded symbolically.
    #[snafu(display("call to \"{callee}\" appears inside an index expression; indices must be affine"))]
    NonAffineIndex { callee: String },

    /// An index expression divides by a constant zero.
    #[snafu(display("division by zero in an index expression"))]
    DivisionByZeroInBounds,
}
