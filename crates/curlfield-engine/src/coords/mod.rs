//! Size types shared by the runtime and renderers.

mod viewport;

pub use viewport::Viewport;
