pub mod consts;
pub mod ctf;
pub mod error;
pub mod estimate;
pub mod fit;
pub mod io;
pub mod pipeline;
pub mod powerspectrum;
pub mod radial;
pub mod simulate;
pub mod spectrum;
