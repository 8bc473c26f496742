//! Integration tests for image parts.

mod common;

use assert_matches::assert_matches;
use common::{encode_image, gradient, temp_file};
use image::ImageFormat;
use multimodal::{DataPart, Error, ImagePart};

#[test]
fn array_views_have_expected_shapes() {
    let file = temp_file(&encode_image(&gradient(1024, 768), ImageFormat::Png), ".png");
    let image = ImagePart::from_file(file.path()).unwrap();

    assert_eq!(image.size(), (1024, 768));
    assert_eq!(image.format(), Some(ImageFormat::Png));
    assert_eq!(image.as_ndarray().unwrap().shape(), &[768, 1024, 3]);
    assert_eq!(image.as_tensor().unwrap().shape(), &[3, 768, 1024]);
}

#[test]
fn png_save_load_preserves_bytes() {
    let image = ImagePart::new(gradient(33, 17));
    let value = image.to_json().unwrap();
    assert!(value["img_data"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let back = ImagePart::from_json(value).unwrap();
    assert_eq!(back.as_bytes("png").unwrap(), image.as_bytes("png").unwrap());
}

#[test]
fn jpeg_file_reports_jpeg_mime() {
    let file = temp_file(&encode_image(&gradient(16, 16), ImageFormat::Jpeg), ".jpg");
    let image = ImagePart::from_file(file.path()).unwrap();
    assert_eq!(image.mime(), "image/jpeg");
}

#[test]
fn content_wins_over_extension() {
    // PNG bytes behind a .jpg name still decode.
    let file = temp_file(&encode_image(&gradient(4, 4), ImageFormat::Png), ".jpg");
    let image = ImagePart::from_file(file.path()).unwrap();
    assert_eq!(image.format(), Some(ImageFormat::Png));
}

#[test]
fn non_image_uri_is_format_error() {
    assert_matches!(
        ImagePart::from_b64_uri("data:text/plain;base64,aGk="),
        Err(Error::Format(_))
    );
}

#[test]
fn corrupt_file_is_an_error() {
    let file = temp_file(b"this is plain text, not a picture", ".png");
    let err = ImagePart::from_file(file.path()).unwrap_err();
    assert!(!err.is_capability_unavailable());
}
