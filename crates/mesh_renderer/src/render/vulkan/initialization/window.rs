//! Window management using GLFW
//!
//! Provides window creation, event polling and surface creation for Vulkan

use ash::vk;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// GLFW refused to create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// GLFW reports no Vulkan support on this system
    #[error("Vulkan is not supported by GLFW on this system")]
    VulkanUnsupported,

    /// Surface creation returned an error code
    #[error("Failed to create Vulkan surface: {0:?}")]
    SurfaceCreation(vk::Result),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a visible, resizable window without a client API
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        Self::create(title, width, height, true)
    }

    /// Create a window that is never shown, for offscreen runs and tests
    pub fn new_hidden(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        Self::create(title, width, height, false)
    }

    fn create(title: &str, width: u32, height: u32, visible: bool) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{:?}", e)))?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::VulkanUnsupported);
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));
        glfw.window_hint(glfw::WindowHint::Visible(visible));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::debug!("Created window '{}' {}x{} (visible: {})", title, width, height, visible);

        Ok(Self { glfw, window, events })
    }

    /// Process pending events and return the keys pressed since the last poll
    pub fn poll_key_presses(&mut self) -> Vec<glfw::Key> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| match event {
                glfw::WindowEvent::Key(key, _, glfw::Action::Press, _) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Block until an event arrives or `timeout` seconds pass
    pub fn wait_events_timeout(&mut self, timeout: f64) {
        self.glfw.wait_events_timeout(timeout);
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_extent(&self) -> vk::Extent2D {
        let (width, height) = self.window.get_framebuffer_size();
        vk::Extent2D {
            width: u32::try_from(width).unwrap_or(0),
            height: u32::try_from(height).unwrap_or(0),
        }
    }

    /// Resize the window's client area
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.window.set_size(
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        );
    }

    /// Whether a close has been requested
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request or cancel a close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or(WindowError::VulkanUnsupported)
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::SurfaceCreation(result))
        }
    }
}
