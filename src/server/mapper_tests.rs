use super::*;
use async_trait::async_trait;
use crate::error::AppError;
use crate::server::options::RequestBody;
use crate::storage::{DirEntry, Encoding, FsError, FsResult, LocalFs};

fn target(p: &str) -> TargetPath { TargetPath::parse(p, None).unwrap() }

fn local_mapper() -> (tempfile::TempDir, ResourceMapper) {
    let tmp = tempfile::tempdir().unwrap();
    let mapper = ResourceMapper::new(Arc::new(LocalFs::new(tmp.path())), OutputFormatter::new());
    (tmp, mapper)
}

/// Driver that yields a fixed listing in a deliberately unsorted order.
struct ScriptedDriver {
    entries: Vec<DirEntry>,
}

fn entry(name: &str, dir: bool) -> DirEntry {
    let path = if dir { format!("/{}/", name) } else { format!("/{}", name) };
    DirEntry { name: name.to_string(), path, dir }
}

#[async_trait]
impl FsDriver for ScriptedDriver {
    async fn list(&self, _dir: &str) -> FsResult<Vec<DirEntry>> { Ok(self.entries.clone()) }
    async fn list_all(&self, _dir: &str) -> FsResult<Vec<DirEntry>> {
        let mut all = self.entries.clone();
        all.push(DirEntry { name: "deep".into(), path: "/z/deep".into(), dir: false });
        Ok(all)
    }
    async fn read_file(&self, path: &str, _encoding: Encoding) -> FsResult<Vec<u8>> {
        Err(FsError::PermissionDenied(path.to_string()))
    }
    async fn write_file(&self, _path: &str, _content: &str, _opts: WriteFileOptions) -> FsResult<()> { Ok(()) }
    async fn mkdir(&self, _path: &str, _mode: u32) -> FsResult<()> { Ok(()) }
    async fn rmdir(&self, _path: &str, _clobber: bool) -> FsResult<()> { Ok(()) }
    async fn unlink(&self, _path: &str) -> FsResult<()> { Ok(()) }
    async fn move_entry(&self, _src: &str, dst: &str, _opts: MoveEntryOptions) -> FsResult<()> {
        Err(FsError::AlreadyExists(dst.to_string()))
    }
}

fn scripted_mapper() -> ResourceMapper {
    let driver = ScriptedDriver { entries: vec![entry("z", true), entry("b.txt", false), entry("a.txt", false)] };
    ResourceMapper::new(Arc::new(driver), OutputFormatter::new())
}

#[tokio::test]
async fn list_preserves_driver_order_through_formatter() {
    let mapper = scripted_mapper();
    mapper.formatter().set_named("uppercase-name").unwrap();
    let out = mapper.list(&target("/"), ListOptions { recursive: false }).await.unwrap();
    let Outcome::Found(items) = out else { panic!("expected a listing") };
    let names: Vec<&str> = items.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Z", "B.TXT", "A.TXT"]);

    let out = mapper.list(&target("/"), ListOptions { recursive: true }).await.unwrap();
    let Outcome::Found(items) = out else { panic!("expected a listing") };
    assert_eq!(items.len(), 4);
    assert_eq!(items[3].path, "/z/deep");
}

#[tokio::test]
async fn other_driver_errors_pass_through_unchanged() {
    let mapper = scripted_mapper();
    let err = mapper.read(&target("/secret"), ReadOptions::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }));
    let mv = MoveOptions { new_path: "/taken".into(), clobber: false, mkdirp: false };
    let err = mapper.move_to(&target("/a.txt"), mv).await.unwrap_err();
    assert_eq!(err.code_str(), "EEXIST");
}

#[tokio::test]
async fn list_on_a_file_is_a_wrong_kind_outcome() {
    let (tmp, mapper) = local_mapper();
    std::fs::write(tmp.path().join("f.txt"), "x").unwrap();
    let out = mapper.list(&target("/f.txt/"), ListOptions::default()).await.unwrap();
    assert_eq!(out, Outcome::WrongKind { expected: Kind::Directory, actual: Kind::File });
}

#[tokio::test]
async fn read_on_a_directory_is_a_wrong_kind_outcome() {
    let (tmp, mapper) = local_mapper();
    std::fs::create_dir(tmp.path().join("d")).unwrap();
    let out = mapper.read(&target("/d"), ReadOptions::default()).await.unwrap();
    assert_eq!(out, Outcome::WrongKind { expected: Kind::File, actual: Kind::Directory });
}

#[tokio::test]
async fn create_then_read_roundtrip_with_media_type() {
    let (_tmp, mapper) = local_mapper();
    let dir = mapper.create(&target("/a/"), CreateOptions::from_body(&RequestBody::default(), Kind::Directory).unwrap()).await.unwrap();
    assert_eq!(dir, ResourceDescriptor { name: "a".into(), path: "/a/".into(), dir: true });

    let body = RequestBody { content: Some("hi".into()), ..Default::default() };
    let file = mapper.create(&target("/a/b.txt"), CreateOptions::from_body(&body, Kind::File).unwrap()).await.unwrap();
    assert_eq!(file, ResourceDescriptor { name: "b.txt".into(), path: "/a/b.txt".into(), dir: false });

    let out = mapper.read(&target("/a/b.txt"), ReadOptions::default()).await.unwrap();
    let Outcome::Found(content) = out else { panic!("expected file content") };
    assert_eq!(content.body, b"hi".to_vec());
    assert_eq!(content.content_type, "text/plain");
}

#[tokio::test]
async fn create_does_not_correct_the_kind_hint() {
    let (tmp, mapper) = local_mapper();
    std::fs::create_dir(tmp.path().join("d")).unwrap();
    let opts = CreateOptions::from_body(&RequestBody::default(), Kind::File).unwrap();
    let err = mapper.create(&target("/d"), opts).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
}

#[tokio::test]
async fn move_echoes_the_source_descriptor() {
    let (tmp, mapper) = local_mapper();
    std::fs::write(tmp.path().join("b.txt"), "b").unwrap();
    let mv = MoveOptions { new_path: "/c.txt".into(), clobber: false, mkdirp: false };
    let d = mapper.move_to(&target("/b.txt"), mv).await.unwrap();
    assert_eq!(d.path, "/b.txt");
    assert!(tmp.path().join("c.txt").exists());
}

#[tokio::test]
async fn delete_selects_primitive_by_kind() {
    let (tmp, mapper) = local_mapper();
    std::fs::create_dir_all(tmp.path().join("d/e")).unwrap();
    std::fs::write(tmp.path().join("d/f"), "x").unwrap();

    let err = mapper.delete(&target("/d/"), DeleteOptions { clobber: false }).await.unwrap_err();
    assert_eq!(err.code_str(), "ENOTEMPTY");

    let f = mapper.delete(&target("/d/f"), DeleteOptions::default()).await.unwrap();
    assert_eq!(f.name, "f");
    let d = mapper.delete(&target("/d/"), DeleteOptions { clobber: true }).await.unwrap();
    assert!(d.dir);
    assert!(!tmp.path().join("d").exists());
}

#[test]
fn media_types_follow_extensions() {
    assert_eq!(content_type_for("/x/page.html"), "text/html");
    assert_eq!(content_type_for("/x/data.json"), "application/json");
    assert_eq!(content_type_for("/x/noext"), "application/octet-stream");
}
