//! Encoder provisioning against a mock build server

mod common;

use std::time::Duration;

use vibecraft_updater::download::{HostPlatform, TransferProgress};
use vibecraft_updater::{EncoderProvisioner, ErrorKind};

const LINUX_ARCHIVE: &str = "/ffmpeg-master-latest-linux64-gpl.zip";

fn provisioner(base_url: &str, dir: &std::path::Path) -> EncoderProvisioner {
    EncoderProvisioner::new(
        HostPlatform::new("linux", "x86_64"),
        base_url,
        dir.join("ffmpeg"),
        Duration::from_secs(30),
    )
}

#[tokio::test]
async fn installs_bin_entry_and_removes_archive() {
    let archive = common::zip_bytes(&[
        ("ffmpeg-build/doc/ffmpeg", b"not this one"),
        ("ffmpeg-build/bin/ffprobe", b"probe"),
        ("ffmpeg-build/bin/ffmpeg", b"\x7fELF encoder"),
    ]);
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", LINUX_ARCHIVE)
        .with_status(200)
        .with_body(&archive)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let encoder = provisioner(&server.url(), dir.path());
    assert!(!encoder.is_installed());

    let mut last = None;
    let path = encoder
        .provision(&mut |p: TransferProgress| last = Some(p))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(path, encoder.binary_path());
    assert!(encoder.is_installed());
    assert_eq!(std::fs::read(&path).unwrap(), b"\x7fELF encoder");
    assert!(!encoder.encoder_dir().join("ffmpeg_temp.zip").exists());
    assert_eq!(last.map(|p| p.percent()), Some(100));
}

#[tokio::test]
async fn archive_without_binary_fails_and_cleans_up() {
    let archive = common::zip_bytes(&[("ffmpeg-master-latest-linux64-gpl/LICENSE.txt", b"GPL")]);
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", LINUX_ARCHIVE)
        .with_status(200)
        .with_body(&archive)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let encoder = provisioner(&server.url(), dir.path());

    let err = encoder
        .provision(&mut |_: TransferProgress| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BinaryNotFoundInArchive);
    assert!(!encoder.is_installed());
    assert!(!encoder.encoder_dir().join("ffmpeg_temp.zip").exists());
}

#[tokio::test]
async fn empty_binary_fails_verification() {
    let archive = common::zip_bytes(&[("build/bin/ffmpeg", b"")]);
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", LINUX_ARCHIVE)
        .with_status(200)
        .with_body(&archive)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();

    let err = provisioner(&server.url(), dir.path())
        .provision(&mut |_: TransferProgress| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallVerificationFailed);
}

#[tokio::test]
async fn missing_build_is_http_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", LINUX_ARCHIVE)
        .with_status(404)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();

    let err = provisioner(&server.url(), dir.path())
        .provision(&mut |_: TransferProgress| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
}

#[tokio::test]
async fn convert_requires_installed_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("capture.webm");
    std::fs::write(&input, b"webm").unwrap();

    let err = provisioner("http://127.0.0.1:9", dir.path())
        .convert_webm_to_mp4(&input, &dir.path().join("capture.mp4"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EncodeFailed);
}

#[cfg(unix)]
#[tokio::test]
async fn convert_rejects_empty_input_and_reports_encoder_failure() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let encoder = provisioner("http://127.0.0.1:9", dir.path());
    std::fs::create_dir_all(encoder.encoder_dir()).unwrap();
    // stand-in encoder that always fails
    std::fs::write(
        encoder.binary_path(),
        "#!/bin/sh\necho 'Invalid data found' >&2\nexit 1\n",
    )
    .unwrap();
    std::fs::set_permissions(
        encoder.binary_path(),
        std::fs::Permissions::from_mode(0o755),
    )
    .unwrap();

    let empty = dir.path().join("empty.webm");
    std::fs::write(&empty, b"").unwrap();
    let err = encoder
        .convert_webm_to_mp4(&empty, &dir.path().join("out.mp4"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EncodeFailed);

    let input = dir.path().join("capture.webm");
    std::fs::write(&input, b"webm").unwrap();
    let err = encoder
        .convert_webm_to_mp4(&input, &dir.path().join("out.mp4"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EncodeFailed);
    assert!(err.to_string().contains("Invalid data found"));
}
