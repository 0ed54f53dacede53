use super::device::DeviceDescriptor;
use super::format::EncodingCandidate;
use tracing::debug;

/// Log every field of each enumerated device
pub fn list_device_details(devices: &[DeviceDescriptor]) {
    for (i, device) in devices.iter().enumerate() {
        debug!("* Device [{}]", i);
        match &device.enclosure {
            Some(enclosure) => {
                debug!("EnclosureLocation.InDock: {}", enclosure.in_dock);
                debug!("EnclosureLocation.InLid: {}", enclosure.in_lid);
                debug!("EnclosureLocation.Panel: {}", enclosure.panel);
            }
            None => debug!("Not in enclosure"),
        }
        debug!("Id: {}", device.id);
        debug!("Name: {}", device.name);
        debug!("IsDefault: {}", device.is_default);
        debug!("IsEnabled: {}", device.is_enabled);

        for (key, value) in &device.properties {
            debug!("{}: {}", key, value);
        }
    }
}

/// Log every advertised format of a stream
pub fn list_format_details(stream: &str, formats: &[EncodingCandidate]) {
    debug!("{} formats: {}", stream, formats.len());
    for (i, format) in formats.iter().enumerate() {
        log_format(i, format);
    }
}

pub fn log_format(index: usize, format: &EncodingCandidate) {
    debug!("* Property [{}]", index);
    debug!("Bitrate: {}", format.bitrate);
    debug!("Framerate: {}", format.frame_rate);
    debug!("Resolution: {}, {}", format.width, format.height);
    debug!("PixelAspectRatio: {}", format.pixel_aspect_ratio);
    debug!("ProfileId: {}", format.profile_id);
    debug!("Subtype: {}", format.subtype);
    debug!("Type: {}", format.media_type);

    for (key, value) in &format.properties {
        debug!("{}: {}", key, value);
    }
}
