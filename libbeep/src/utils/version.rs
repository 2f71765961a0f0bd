//! Firmware version comparison.
//!
//! Device firmware reports versions such as `1.4.2` or `1.0.4-beta`. They are
//! compared through a single number: `major*1000 + minor*100 + patch*10 + tag`
//! where the pre-release tag weighs `alpha=0`, `beta=2`, `rc=4` and anything
//! else (including no tag) `9`.

/// Numeric form of a firmware version string; `0` when it cannot be parsed.
pub fn firmware_version_number(version: &str) -> u32 {
    let (numbers, tag) = match version.trim().split_once('-') {
        Some((numbers, tag)) => (numbers, Some(tag)),
        None => (version.trim(), None),
    };

    let parts: Vec<&str> = numbers.split('.').collect();
    if parts.len() != 3 {
        return 0;
    }

    let mut components = [0u32; 3];
    for (slot, part) in components.iter_mut().zip(parts) {
        // each component is at most two digits on the device side
        if part.is_empty() || part.len() > 2 {
            return 0;
        }
        match part.parse::<u32>() {
            Ok(v) => *slot = v,
            Err(_) => return 0,
        }
    }

    let tag_weight = match tag.map(|t| t.to_ascii_lowercase()) {
        Some(t) if t == "alpha" => 0,
        Some(t) if t == "beta" => 2,
        Some(t) if t == "rc" => 4,
        _ => 9,
    };

    components[0] * 1000 + components[1] * 100 + components[2] * 10 + tag_weight
}

/// True when `version` is at least `minimum`. Unparseable versions never are.
pub fn is_firmware_supported(version: &str, minimum: &str) -> bool {
    let v = firmware_version_number(version);
    v != 0 && v >= firmware_version_number(minimum)
}
