pub mod mass;
pub mod mock_kernel;
pub mod primitives;
pub mod traits;
pub mod triangulation;
pub mod truck_introspect;
pub mod truck_kernel;
pub mod types;
pub mod wire_loops;

pub use mock_kernel::MockKernel;
pub use traits::*;
pub use truck_kernel::TruckKernel;
pub use types::*;
