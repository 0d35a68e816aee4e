use candle_core::Device;

/// Requested compute device, read from `APP_EMBED_DEVICE` (`auto`, `cpu`, `metal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Metal,
}

impl DevicePreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Some(Self::Auto),
            "cpu" => Some(Self::Cpu),
            "metal" | "mps" => Some(Self::Metal),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        match std::env::var("APP_EMBED_DEVICE") {
            Ok(v) => Self::parse(&v).unwrap_or_else(|| {
                tracing::warn!(value = %v, "unrecognized APP_EMBED_DEVICE, using auto");
                Self::Auto
            }),
            Err(_) => Self::Auto,
        }
    }
}

/// Metal when built with the `metal` feature and not overridden to CPU; CPU otherwise.
pub fn select_device(preference: DevicePreference) -> Device {
    if preference != DevicePreference::Cpu {
        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(dev) => {
                    tracing::info!("embedding device: Metal (MPS)");
                    return dev;
                }
                Err(e) => tracing::warn!(error = %e, "Metal unavailable, falling back to CPU"),
            }
        }
        #[cfg(not(feature = "metal"))]
        if preference == DevicePreference::Metal {
            tracing::warn!("built without the `metal` feature, using CPU");
        }
    }
    tracing::info!("embedding device: CPU");
    Device::Cpu
}
