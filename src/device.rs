//! Camera enumeration and selection

use crate::camera::CameraPlatform;
use crate::error::{DecodeError, ErrorCode, PlatformError};
use crate::models::DeviceDescriptor;
use tracing::debug;

/// Label fragments that mark a rear-facing camera
const PREFERRED_LABEL_HINTS: [&str; 2] = ["back", "rear"];

/// List the platform's video input devices.
///
/// Zero cameras is an empty list, not an error. A platform without
/// enumeration support yields `NOT_SUPPORTED`; any other platform failure
/// yields `CAMERA_ERROR`.
pub async fn list_video_devices<P>(platform: &P) -> Result<Vec<DeviceDescriptor>, DecodeError>
where
    P: CameraPlatform + ?Sized,
{
    let devices = platform.enumerate_devices().await.map_err(|err| match err {
        PlatformError::Unsupported => DecodeError::new(
            ErrorCode::NotSupported,
            "Device enumeration is not supported on this platform",
        ),
        other => DecodeError::new(
            ErrorCode::CameraError,
            format!("Failed to enumerate cameras: {other}"),
        ),
    })?;

    let video: Vec<DeviceDescriptor> = devices.into_iter().filter(|d| d.is_video()).collect();
    debug!(count = video.len(), "enumerated video devices");
    Ok(video)
}

/// Pick the camera to scan with.
///
/// Best effort: the first device whose label contains "back" or "rear"
/// (case-insensitive), else the first device. Labels are platform-supplied
/// and are often empty before camera permission is granted, in which case
/// the first device wins.
pub fn select_preferred(devices: &[DeviceDescriptor]) -> Option<&DeviceDescriptor> {
    devices
        .iter()
        .find(|device| {
            let label = device.label.to_lowercase();
            PREFERRED_LABEL_HINTS.iter().any(|hint| label.contains(*hint))
        })
        .or_else(|| devices.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::replay::ReplayPlatform;
    use crate::models::DeviceKind;

    #[test]
    fn prefers_back_camera() {
        let devices = vec![
            DeviceDescriptor::video("front", "Front Camera"),
            DeviceDescriptor::video("back", "Back Camera"),
        ];
        assert_eq!(select_preferred(&devices).unwrap().label, "Back Camera");
    }

    #[test]
    fn rear_matches_case_insensitively() {
        let devices = vec![
            DeviceDescriptor::video("0", "Integrated Webcam"),
            DeviceDescriptor::video("1", "USB REAR cam"),
        ];
        assert_eq!(select_preferred(&devices).unwrap().id, "1");
    }

    #[test]
    fn unlabeled_device_falls_back_to_first() {
        let devices = vec![DeviceDescriptor::video("only", "")];
        assert_eq!(select_preferred(&devices).unwrap().id, "only");
    }

    #[test]
    fn first_device_when_nothing_matches() {
        let devices = vec![
            DeviceDescriptor::video("a", "Front Camera"),
            DeviceDescriptor::video("b", "Desk Camera"),
        ];
        assert_eq!(select_preferred(&devices).unwrap().id, "a");
        assert!(select_preferred(&[]).is_none());
    }

    #[tokio::test]
    async fn enumeration_filters_non_video() {
        let platform = ReplayPlatform::new(Vec::new()).with_devices(vec![
            DeviceDescriptor {
                id: "mic".into(),
                label: "Microphone".into(),
                kind: DeviceKind::AudioInput,
            },
            DeviceDescriptor::video("cam", "Back Camera"),
        ]);
        let devices = list_video_devices(&platform).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "cam");
    }

    #[tokio::test]
    async fn zero_devices_is_empty_not_error() {
        let platform = ReplayPlatform::new(Vec::new()).with_devices(Vec::new());
        assert!(list_video_devices(&platform).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_enumeration_is_not_supported() {
        let platform = ReplayPlatform::new(Vec::new()).without_enumeration();
        let err = list_video_devices(&platform).await.unwrap_err();
        assert!(err.is(ErrorCode::NotSupported));
    }
}
