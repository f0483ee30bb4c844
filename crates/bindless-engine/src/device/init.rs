/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// The bindless demo redraws continuously, so vsync is left to FIFO.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Extra wgpu features requested on top of the bindless set.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    ///
    /// When `require_bindless` is set the binding-array limit is raised to
    /// what the adapter offers.
    pub required_limits: wgpu::Limits,

    /// Refuse to create a device unless the adapter supports bindless
    /// residency. Checked once, before any image exists.
    pub require_bindless: bool,

    /// Desired maximum frame latency for the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            require_bindless: true,
            desired_maximum_frame_latency: 2,
        }
    }
}
