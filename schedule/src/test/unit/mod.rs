pub mod apply;
pub mod tilings;
