use granary::io::compression::open_source;
use granary::testing::SpoolDir;
use std::io::Read;

#[test]
fn plain_files_pass_through_untouched() -> anyhow::Result<()> {
    let spool = SpoolDir::new()?;
    let path = spool.write_plain("test_data.20240512.csv", "a,b\n1,2\n")?;

    let mut out = String::new();
    open_source(&path)?.read_to_string(&mut out)?;
    assert_eq!(out, "a,b\n1,2\n");
    Ok(())
}

#[test]
fn missing_file_is_fatal() {
    let err = open_source("/nonexistent/never.csv.gz").err().expect("must fail");
    assert!(err.to_string().contains("/nonexistent/never.csv.gz"));
}

#[cfg(feature = "compression-gzip")]
mod gzip {
    use super::*;

    #[test]
    fn gz_extension_decompresses() -> anyhow::Result<()> {
        let spool = SpoolDir::new()?;
        let path = spool.write_gzip("test_data.20240512.csv.gz", "a,b\n1,2\n")?;

        let mut out = String::new();
        open_source(&path)?.read_to_string(&mut out)?;
        assert_eq!(out, "a,b\n1,2\n");
        Ok(())
    }

    #[test]
    fn magic_bytes_rescue_a_misnamed_archive() -> anyhow::Result<()> {
        let spool = SpoolDir::new()?;
        // Gzip content behind an extension no codec claims.
        let gz = spool.write_gzip("data.bin.gz", "a,b\n1,2\n")?;
        let renamed = spool.file("data.bin");
        std::fs::rename(&gz, &renamed)?;

        let mut out = String::new();
        open_source(&renamed)?.read_to_string(&mut out)?;
        assert_eq!(out, "a,b\n1,2\n");
        Ok(())
    }

    #[test]
    fn corrupt_archive_surfaces_as_a_read_error() -> anyhow::Result<()> {
        let spool = SpoolDir::new()?;
        let path = spool.write_plain("broken.csv.gz", "this is not gzip")?;

        let mut out = String::new();
        let result = open_source(&path)?.read_to_string(&mut out);
        assert!(result.is_err());
        Ok(())
    }
}

#[cfg(feature = "compression-zstd")]
mod zstd_codec {
    use super::*;
    use std::io::Write;

    #[test]
    fn zst_extension_decompresses() -> anyhow::Result<()> {
        let spool = SpoolDir::new()?;
        let path = spool.file("test_data.20240512.csv.zst");
        let file = std::fs::File::create(&path)?;
        let mut encoder = zstd::stream::write::Encoder::new(file, 3)?;
        encoder.write_all(b"a,b\n1,2\n")?;
        encoder.finish()?;

        let mut out = String::new();
        open_source(&path)?.read_to_string(&mut out)?;
        assert_eq!(out, "a,b\n1,2\n");
        Ok(())
    }
}
