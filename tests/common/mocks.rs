//! Mock version of std::fs::File;
use mockall::mock;

use std::io::{self, Write};

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

/// A sink whose every write fails with `kind`.
pub fn broken_sink(kind: io::ErrorKind) -> MockFile {
    let mut file = MockFile::default();
    file.expect_write()
        .returning(move |_| Err(io::Error::new(kind, "sink closed")));
    file.expect_flush().returning(|| Ok(()));
    file
}
