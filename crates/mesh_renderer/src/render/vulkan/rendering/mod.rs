//! Shaders, render pass, pipeline and command pools

pub mod commands;
pub mod pipeline;
pub mod render_pass;
pub mod shader;

pub use commands::CommandPool;
pub use pipeline::MeshPipeline;
pub use render_pass::RenderPass;
pub use shader::ShaderModule;
