//! Formulation Renderers

pub mod typst;
