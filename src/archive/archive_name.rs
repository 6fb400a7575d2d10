use super::ArchiveError;

/// The suffix of a zipped Zarr archive.
pub const ZARR_ZIP_SUFFIX: &str = ".zarr.zip";

/// Normalise an archive name so that it ends with `.zarr.zip`.
///
/// | name | normalised |
/// |---|---|
/// | `x` | `x.zarr.zip` |
/// | `x.zarr` | `x.zarr.zip` |
/// | `x.zip` | `x.zarr.zip` |
/// | `x.zarr.zip` | `x.zarr.zip` |
///
/// Parent directories are kept, e.g. `out/x.zip` becomes `out/x.zarr.zip`.
///
/// # Errors
/// Returns [`ArchiveError::InvalidArgument`] if `name` is empty, ends with a path separator, or has an empty file stem.
pub fn normalise_archive_name(name: &str) -> Result<String, ArchiveError> {
    if name.is_empty() || name.ends_with('/') || name.ends_with(std::path::MAIN_SEPARATOR) {
        return Err(ArchiveError::InvalidArgument(format!(
            "archive name {name:?} is not a file name"
        )));
    }

    let normalised = if name.ends_with(ZARR_ZIP_SUFFIX) {
        name.to_string()
    } else if name.ends_with(".zarr") {
        format!("{name}.zip")
    } else if let Some(stem) = name.strip_suffix(".zip") {
        format!("{stem}{ZARR_ZIP_SUFFIX}")
    } else {
        format!("{name}{ZARR_ZIP_SUFFIX}")
    };

    let file_name = normalised
        .rsplit(['/', std::path::MAIN_SEPARATOR])
        .next()
        .unwrap_or_default();
    if file_name.len() <= ZARR_ZIP_SUFFIX.len() {
        return Err(ArchiveError::InvalidArgument(format!(
            "archive name {name:?} has an empty stem"
        )));
    }
    Ok(normalised)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_name_normalise() {
        for (name, expected) in [
            ("x", "x.zarr.zip"),
            ("x.zarr", "x.zarr.zip"),
            ("x.zip", "x.zarr.zip"),
            ("x.zarr.zip", "x.zarr.zip"),
            ("x.nc", "x.nc.zarr.zip"),
            ("out/x.zip", "out/x.zarr.zip"),
            ("a/b/x.zarr", "a/b/x.zarr.zip"),
        ] {
            assert_eq!(normalise_archive_name(name).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn archive_name_invalid() {
        for name in ["", "out/", ".zip", ".zarr", ".zarr.zip", "out/.zip"] {
            assert!(
                matches!(
                    normalise_archive_name(name),
                    Err(ArchiveError::InvalidArgument(_))
                ),
                "{name}"
            );
        }
    }
}
