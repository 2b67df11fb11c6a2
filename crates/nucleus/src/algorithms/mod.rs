pub mod structuring;
pub mod primitives;
pub mod toggle;
pub mod threshold;
pub mod seeds;
pub mod gradient;
pub mod segmentation;
pub mod cytoplasm;

pub use structuring::*;
pub use toggle::*;
pub use threshold::*;
pub use seeds::*;
pub use gradient::*;
pub use segmentation::*;
pub use cytoplasm::*;
