//! Platform identifiers used to label build artifacts.

/// Pointer width of the running build, e.g. `64bit`.
#[must_use]
pub fn architecture() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64bit"
    } else if cfg!(target_pointer_width = "32") {
        "32bit"
    } else {
        "16bit"
    }
}

/// Lowercase name of the operating system, e.g. `linux`, `darwin` or `windows`.
#[must_use]
pub fn system() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Operating system followed by the pointer width, e.g. `linux64`.
#[must_use]
pub fn architecture_string() -> String {
    format!("{}{}", system(), &architecture()[..2])
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq as sim_assert_eq;

    #[test]
    fn test_architecture_string() {
        let arch = super::architecture_string();
        assert!(arch.starts_with(super::system()), "{arch}");
        #[cfg(all(target_os = "linux", target_pointer_width = "64"))]
        sim_assert_eq!(arch, "linux64");
        #[cfg(all(target_os = "macos", target_pointer_width = "64"))]
        sim_assert_eq!(arch, "darwin64");
        #[cfg(all(target_os = "windows", target_pointer_width = "32"))]
        sim_assert_eq!(arch, "windows32");
    }

    #[test]
    fn test_architecture() {
        let arch = super::architecture();
        assert!(arch.ends_with("bit"), "{arch}");
        sim_assert_eq!(arch[..2].parse::<usize>().ok(), Some(usize::BITS as usize));
    }
}
