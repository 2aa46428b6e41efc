use qcv::{Archive, ArchiveError, Buffer, HeaderError, LoadOptions};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

#[test]
fn test_fib_scenario() {
    let mut ar = Archive::new();
    ar.add_data("fib", "0\n1\n1\n2", None);
    ar.set_comment("numbers");

    let back = Archive::from_buffer(&ar.to_buffer().unwrap()).unwrap();
    assert_eq!(back.get_comment_of("fib"), None);
    assert_eq!(back.comment(), Some("numbers"));
    assert_eq!(*back.get_data("fib").unwrap(), *b"0\n1\n1\n2");
}

#[test]
fn test_serialize_roundtrip() {
    let mut ar = Archive::new();
    ar.set_comment("comment");
    ar.add_data("test", Buffer::from_vec(vec![5, 6, 7]), Some("comment2"));
    ar.add_data("empty", Buffer::alloc(0), Some(""));
    ar.add_data("some/folder/kitty", Buffer::from_vec((0..=255).collect()), Some("A cute kitten"));

    let back = Archive::from_buffer(&ar.to_buffer().unwrap()).unwrap();
    assert_eq!(back.comment(), Some("comment"));
    assert_eq!(back.list_entries(), ar.list_entries());
    assert_eq!(back.get_comment_of("test"), Some("comment2"));
    assert_eq!(back.get_comment_of("empty"), Some(""));
    assert_eq!(*back.get_data("test").unwrap(), [5, 6, 7]);
    assert_eq!(back.get_data("empty").unwrap().len(), 0);
    assert_eq!(back.get_data("some/folder/kitty").unwrap().to_vec(), (0..=255).collect::<Vec<u8>>());
    assert_eq!(back, ar);
}

#[test]
fn test_empty_archive() {
    let ar = Archive::new();
    let back = Archive::from_buffer(&ar.to_buffer().unwrap()).unwrap();
    assert_eq!(back.comment(), None);
    assert_eq!(back.get_comment_of("test"), None);
    assert!(back.list_entries().is_empty());
}

#[test]
fn test_empty_comment_survives_roundtrip() {
    let mut ar = Archive::new();
    ar.set_comment("");
    let back = Archive::from_buffer(&ar.to_buffer().unwrap()).unwrap();
    assert_eq!(back.comment(), Some(""));
}

#[test]
fn test_views_survive_reencoding() {
    let mut ar = Archive::new();
    ar.add_data("view", Buffer::from_vec(vec![5, 6, 7]), None);

    let ar2 = Archive::from_buffer(&ar.to_buffer().unwrap()).unwrap();
    assert!(ar2.entry("view").unwrap().data().is_borrowed());
    ar2.get_data("view").unwrap().write_u8(0, 2);

    let ar3 = Archive::from_buffer(&ar2.to_buffer().unwrap()).unwrap();
    assert_eq!(ar3.get_data("view").unwrap().read_u8(0), 2);
}

#[test]
fn test_concatenated_segments_override() {
    let data = [1u8, 2, 3];
    let buffers: Vec<Buffer> = (0..3)
        .map(|i| {
            let mut ar = Archive::new();
            ar.set_comment(format!("test{i}"));
            ar.add_data(&format!("test{i}"), Buffer::from_vec(vec![data[i]]), Some("comment"));
            ar.add_data("overwritten", Buffer::from_vec(vec![data[i]]), Some(format!("from {i}").as_str()));
            ar.to_buffer().unwrap()
        })
        .collect();

    let ar = Archive::from_buffer(&Buffer::concat(&buffers)).unwrap();
    assert_eq!(ar.comment(), Some("test2"));
    for (i, byte) in data.iter().enumerate() {
        let name = format!("test{i}");
        assert_eq!(ar.get_data(&name).unwrap().read_u8(0), *byte);
        assert_eq!(ar.get_comment_of(&name), Some("comment"));
    }
    assert_eq!(*ar.get_data("overwritten").unwrap(), [3]);
    assert_eq!(ar.get_comment_of("overwritten"), Some("from 2"));
    assert_eq!(ar.len(), 4);
}

#[test]
fn test_later_segment_without_comment_clears_it() {
    let mut first = Archive::new();
    first.set_comment("old");
    let second = Archive::new();
    let joined = Buffer::concat([&first.to_buffer().unwrap(), &second.to_buffer().unwrap()]);
    assert_eq!(Archive::from_buffer(&joined).unwrap().comment(), None);
}

#[test]
fn test_survives_arbitrary_trailing_data() {
    let mut ar = Archive::new();
    ar.add_data("test", Buffer::from_vec(vec![5, 6, 7]), None);
    ar.set_comment("kept");

    let joined = Buffer::concat([&ar.to_buffer().unwrap(), &Buffer::from_vec(vec![1, 5, 3, 5, 6, 4])]);
    let back = Archive::from_buffer(&joined).unwrap();
    assert_eq!(back.list_entries(), vec!["test"]);
    assert_eq!(*back.get_data("test").unwrap(), [5, 6, 7]);
    assert_eq!(back.comment(), Some("kept"));

    let strict = LoadOptions { reject_trailing_bytes: true, ..Default::default() };
    assert!(Archive::from_buffer_with(&joined, &strict).is_err());
}

#[test]
fn test_trailing_signature_fragment_is_ignored() {
    let ar = Archive::new();
    let buf = ar.to_buffer().unwrap();
    // A partial header at the tail looks like a segment start but is too short.
    let tail = buf.slice(..20).to_owned_copy();
    let back = Archive::from_buffer(&Buffer::concat([&buf, &tail])).unwrap();
    assert!(back.is_empty());
}

#[test]
fn test_detects_utf8_transcoding() {
    let buf = Archive::new().to_buffer().unwrap();
    let text = String::from_utf8_lossy(&buf.borrow()).into_owned();
    // Each invalid byte becomes U+FFFD (3 bytes), shifting the signature.
    let err = Archive::from_buffer(&Buffer::from_text(&text)).unwrap_err();
    assert!(matches!(err, ArchiveError::Header(HeaderError::NotAnArchive)), "{err}");
}

#[test]
fn test_corruption_diagnoses() {
    let cases = [
        (0usize, 0x09u8, HeaderError::TextTranscoded),
        (4, 0x0A, HeaderError::DosLineEndings),
        (5, 0x20, HeaderError::CStringTruncated),
        (6, 0x0D, HeaderError::UnixLineEndings),
        (3, b'X', HeaderError::NotAnArchive),
    ];
    for (at, value, expected) in cases {
        let buf = Archive::new().to_buffer().unwrap();
        buf.write_u8(at, value);
        match Archive::from_buffer(&buf) {
            Err(ArchiveError::Header(e)) => assert_eq!(e, expected, "byte {at}"),
            other => panic!("byte {at}: unexpected {other:?}"),
        }
    }
}

#[test]
fn test_crlf_rewrite_is_detected() {
    let buf = Archive::new().to_buffer().unwrap();
    let mut rewritten = Vec::new();
    for &b in buf.borrow().iter() {
        if b == b'\n' {
            rewritten.push(b'\r');
        }
        rewritten.push(b);
    }
    assert!(matches!(
        Archive::from_buffer(&Buffer::from_vec(rewritten)),
        Err(ArchiveError::Header(HeaderError::UnixLineEndings))
    ));
}

#[test]
fn test_truncated_buffer_is_not_an_archive() {
    let buf = Archive::new().to_buffer().unwrap();
    let truncated = buf.slice(..5).to_owned_copy();
    assert!(matches!(
        Archive::from_buffer(&truncated),
        Err(ArchiveError::Header(HeaderError::TooShort))
    ));
}

#[test]
fn test_c_string_truncation_is_detected() {
    // A C-string copy stops at the NUL in byte 5; what follows is whatever
    // the destination held, here spaces.
    let buf = Archive::new().to_buffer().unwrap();
    let mut copied = buf.borrow()[..5].to_vec();
    copied.resize(buf.len(), b' ');
    assert!(matches!(
        Archive::from_buffer(&Buffer::from_vec(copied)),
        Err(ArchiveError::Header(HeaderError::CStringTruncated))
    ));
}

#[test]
fn test_file_roundtrip() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let mut ar = Archive::new();
    ar.set_comment("A basic test file for the QCV format");
    ar.add_data("fib", "0 0\n1 1\n2 1\n3 2", Some("A list of fibonacci numbers"));
    ar.add_data("squares", "1 1 1.0\n2 4 1.414", Some("A list of squares and square roots"));
    ar.write_to(temp_file.as_file_mut()).unwrap();

    let back = Archive::read_from(File::open(temp_file.path()).unwrap()).unwrap();
    assert_eq!(back.comment(), Some("A basic test file for the QCV format"));
    assert_eq!(back.get_comment_of("squares"), Some("A list of squares and square roots"));
    assert_eq!(*back.get_data("fib").unwrap(), *b"0 0\n1 1\n2 1\n3 2");
}

#[test]
fn test_append_segment_to_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let mut first = Archive::new();
    first.add_data("a", "one", None);
    first.write_to(temp_file.as_file_mut()).unwrap();

    let mut second = Archive::new();
    second.add_data("a", "two", Some("updated"));
    second.add_data("b", "new", None);
    let file = temp_file.as_file_mut();
    file.seek(SeekFrom::End(0)).unwrap();
    file.write_all(&second.to_buffer().unwrap().borrow()).unwrap();

    let back = Archive::read_from(File::open(temp_file.path()).unwrap()).unwrap();
    assert_eq!(*back.get_data("a").unwrap(), *b"two");
    assert_eq!(back.get_comment_of("a"), Some("updated"));
    assert_eq!(*back.get_data("b").unwrap(), *b"new");
    assert_eq!(qcv::scan_segments(&Buffer::from_vec(std::fs::read(temp_file.path()).unwrap())).unwrap().len(), 2);
}
