use serde::Serialize;

/// Optional operations a vision backend may lack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub adaptive_equalization: bool,
}

impl Capabilities {
    pub fn full() -> Self {
        Self {
            adaptive_equalization: true,
        }
    }

    pub fn equalizer(&self) -> Equalizer {
        if self.adaptive_equalization {
            Equalizer::Adaptive
        } else {
            Equalizer::Global
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// How CLAHE requests are served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Equalizer {
    /// Contrast-limited adaptive equalization
    Adaptive,
    /// Global histogram equalization standing in for CLAHE
    Global,
}

/// Trait that all vision backends must implement
pub trait VisionBackend: Send + Sync {
    /// Returns the backend identifier
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the backend
    fn description(&self) -> &'static str;

    /// Readiness signal polled by the runtime
    fn is_loaded(&self) -> bool;

    fn supports_adaptive_equalization(&self) -> bool;

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            adaptive_equalization: self.supports_adaptive_equalization(),
        }
    }
}

/// Pure Rust backend built on `image` and `imageproc`
pub struct NativeBackend {
    adaptive_equalization: bool,
}

impl NativeBackend {
    pub fn new(disable_clahe: bool) -> Self {
        let adaptive_equalization = cfg!(feature = "clahe") && !disable_clahe;
        if !adaptive_equalization {
            tracing::info!("Adaptive equalization unavailable, CLAHE falls back to global equalization");
        }
        Self {
            adaptive_equalization,
        }
    }
}

impl VisionBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn description(&self) -> &'static str {
        "image + imageproc (pure Rust)"
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn supports_adaptive_equalization(&self) -> bool {
        self.adaptive_equalization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_clahe_resolves_to_global_equalizer() {
        let backend = NativeBackend::new(true);
        assert!(backend.is_loaded());
        assert_eq!(backend.capabilities().equalizer(), Equalizer::Global);
    }

    #[cfg(feature = "clahe")]
    #[test]
    fn test_clahe_feature_enables_adaptive_equalizer() {
        let backend = NativeBackend::new(false);
        assert_eq!(backend.capabilities().equalizer(), Equalizer::Adaptive);
    }
}
