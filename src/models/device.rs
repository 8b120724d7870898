use serde::{Deserialize, Serialize};

/// Media device category as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Camera
    #[serde(rename = "videoinput")]
    VideoInput,
    /// Microphone
    #[serde(rename = "audioinput")]
    AudioInput,
    /// Speaker or headset
    #[serde(rename = "audiooutput")]
    AudioOutput,
}

/// Platform-supplied description of a media device
///
/// The label may be empty until the user grants camera permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque platform identifier
    pub id: String,
    /// Human readable label, possibly empty
    pub label: String,
    /// Device category
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    /// Describe a camera
    pub fn video(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }

    /// True for video input devices
    pub fn is_video(&self) -> bool {
        self.kind == DeviceKind::VideoInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uses_platform_names() {
        let device = DeviceDescriptor::video("cam0", "Back Camera");
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["kind"], "videoinput");
        assert!(device.is_video());
    }
}
