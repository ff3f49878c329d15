//! Executable detection, one probe per platform family.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::util::absolutize_path;

/// Decides whether a path is executable for the current platform.
pub trait ExecutableProbe {
    /// `false` for anything that cannot be inspected.
    fn is_executable(&self, path: &Path) -> bool;
}

/// Any of the `0o111` permission bits set on the path itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeBitsProbe;

impl ExecutableProbe for ModeBitsProbe {
    fn is_executable(&self, path: &Path) -> bool {
        let Ok(stat) = fs::metadata(path) else {
            return false;
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            stat.permissions().mode() & 0o111 != 0
        }
        #[cfg(not(unix))]
        {
            let _ = stat;
            false
        }
    }
}

/// Valid PE image: `MZ` DOS header, `PE\0\0` signature and a known machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableExecutableProbe;

const OFFSET_PE_POINTER: u64 = 0x3c;
const IMAGE_FILE_MACHINE_UNKNOWN: u16 = 0;

impl ExecutableProbe for PortableExecutableProbe {
    fn is_executable(&self, path: &Path) -> bool {
        read_pe_machine(path).is_some_and(|machine| machine != IMAGE_FILE_MACHINE_UNKNOWN)
    }
}

fn read_pe_machine(path: &Path) -> Option<u16> {
    let mut file = File::open(path).ok()?;

    let mut header_dos = [0u8; 2];
    file.read_exact(&mut header_dos).ok()?;
    if &header_dos != b"MZ" {
        return None;
    }

    let mut raw_offset = [0u8; 4];
    file.seek(SeekFrom::Start(OFFSET_PE_POINTER)).ok()?;
    file.read_exact(&mut raw_offset).ok()?;
    let offset_pe = u32::from_le_bytes(raw_offset);

    let mut header_pe = [0u8; 6];
    file.seek(SeekFrom::Start(u64::from(offset_pe))).ok()?;
    file.read_exact(&mut header_pe).ok()?;
    if &header_pe[..4] != b"PE\0\0" {
        return None;
    }
    Some(u16::from_le_bytes([header_pe[4], header_pe[5]]))
}

#[cfg(windows)]
type PlatformProbe = PortableExecutableProbe;
#[cfg(not(windows))]
type PlatformProbe = ModeBitsProbe;

/// Whether `path` is executable, using the probe for the build target.
pub fn is_executable<P: AsRef<Path>>(path: P) -> bool {
    let path_abs = absolutize_path(path.as_ref());
    PlatformProbe::default().is_executable(&path_abs)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{ExecutableProbe, PortableExecutableProbe, is_executable};

    fn build_pe_image(machine: u16) -> Vec<u8> {
        let mut raw = vec![0u8; 0x40];
        raw[..2].copy_from_slice(b"MZ");
        raw[0x3c..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        raw.extend_from_slice(b"PE\0\0");
        raw.extend_from_slice(&machine.to_le_bytes());
        raw.extend_from_slice(&[0u8; 18]);
        raw
    }

    #[test]
    fn pe_probe_accepts_known_machine() {
        let tmp = TempDir::new().expect("tempdir");
        let path_exe = tmp.path().join("app.exe");
        fs::write(&path_exe, build_pe_image(0x8664)).expect("write");

        assert!(PortableExecutableProbe.is_executable(&path_exe));
    }

    #[test]
    fn pe_probe_rejects_unknown_or_foreign() {
        let tmp = TempDir::new().expect("tempdir");

        let path_unknown = tmp.path().join("unknown.exe");
        fs::write(&path_unknown, build_pe_image(0)).expect("write");
        assert!(!PortableExecutableProbe.is_executable(&path_unknown));

        let path_text = tmp.path().join("readme.txt");
        fs::write(&path_text, "MZ but nothing else").expect("write");
        assert!(!PortableExecutableProbe.is_executable(&path_text));

        assert!(!PortableExecutableProbe.is_executable(&tmp.path().join("missing.exe")));
    }

    #[cfg(unix)]
    #[test]
    fn mode_bits_decide_on_unix() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tempdir");
        let path_script = tmp.path().join("run.sh");
        fs::write(&path_script, "#!/bin/sh\n").expect("write");

        fs::set_permissions(&path_script, fs::Permissions::from_mode(0o644)).expect("chmod");
        assert!(!is_executable(&path_script));

        fs::set_permissions(&path_script, fs::Permissions::from_mode(0o755)).expect("chmod");
        assert!(is_executable(&path_script));

        assert!(!is_executable(tmp.path().join("missing")));
    }
}
