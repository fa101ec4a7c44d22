//! Maps POSIX `errno` values to [`MpiErrorClass`] so that the no-MPI-IO
//! ring fallback and the single-process stub present the same error
//! vocabulary as a real MPI-IO implementation would (spec.md §4.4's closing
//! paragraph).

use crate::error::MpiErrorClass;

/// Classifies a raw OS error number (as returned by `std::io::Error::raw_os_error`).
pub fn classify_errno(errno: Option<i32>) -> MpiErrorClass {
    let Some(errno) = errno else {
        return MpiErrorClass::Io;
    };
    if errno == libc::EBADF {
        MpiErrorClass::File
    } else if errno == libc::EINVAL {
        MpiErrorClass::Amode
    } else if errno == libc::ENOENT {
        MpiErrorClass::NoSuchFile
    } else if errno == libc::EEXIST {
        MpiErrorClass::FileExists
    } else if errno == libc::EACCES {
        MpiErrorClass::Access
    } else if errno == libc::ENOSPC {
        MpiErrorClass::NoSpace
    } else if errno == libc::EMFILE || errno == libc::ENFILE {
        MpiErrorClass::FileInUse
    } else if errno == libc::EROFS {
        MpiErrorClass::ReadOnly
    } else if errno == libc::EDQUOT {
        MpiErrorClass::Quota
    } else if errno == libc::ENAMETOOLONG || errno == libc::EISDIR {
        MpiErrorClass::BadFile
    } else if errno == libc::EIO {
        MpiErrorClass::Io
    } else {
        MpiErrorClass::Io
    }
}

/// Classifies a [`std::io::Error`] directly.
pub fn classify_io_error(err: &std::io::Error) -> MpiErrorClass {
    classify_errno(err.raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_enoent() {
        assert_eq!(classify_errno(Some(libc::ENOENT)), MpiErrorClass::NoSuchFile);
    }

    #[test]
    fn maps_eexist() {
        assert_eq!(classify_errno(Some(libc::EEXIST)), MpiErrorClass::FileExists);
    }

    #[test]
    fn maps_eacces() {
        assert_eq!(classify_errno(Some(libc::EACCES)), MpiErrorClass::Access);
    }

    #[test]
    fn unknown_errno_falls_back_to_io() {
        assert_eq!(classify_errno(Some(999_999)), MpiErrorClass::Io);
    }

    #[test]
    fn missing_errno_is_io() {
        assert_eq!(classify_errno(None), MpiErrorClass::Io);
    }

    #[test]
    fn real_not_found_error_classifies_as_no_such_file() {
        let err = std::fs::File::open("/nonexistent/path/scda-test").unwrap_err();
        assert_eq!(classify_io_error(&err), MpiErrorClass::NoSuchFile);
    }
}
