//! Full remote-helper sessions against in-memory and on-disk repositories.

use cid::Cid;
use pfg_consensus::RecordingAudit;
use pfg_git::{Git2Repository, MemoryRepository, ObjectRepository};
use pfg_ipfs::MemoryStore;
use pfg_protocol::{Protocol, ProtocolError, Session};
use pfg_remote::{PeerforgeRemote, LARGE_OBJECT_THRESHOLD};
use pfg_storage::{lobj_key, GitObject, MemoryTracker, ObjectId, Tracker, TreeEntry};
use std::sync::Arc;
use tempfile::TempDir;

const SIGNATURE: &str = "Alice <alice@example.com> 1700000000 +0000";

/// One local repository talking to a shared store.
struct Client {
    repo: Arc<dyn ObjectRepository>,
    tracker: Arc<MemoryTracker>,
}

impl Client {
    fn memory() -> (Self, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let client = Self {
            repo: repo.clone(),
            tracker: Arc::new(MemoryTracker::new()),
        };
        (client, repo)
    }

    /// Runs one session and returns its output and the final root.
    fn session(
        &self,
        store: &Arc<MemoryStore>,
        audit: &Arc<RecordingAudit>,
        root: Cid,
        input: &str,
    ) -> (Result<(), ProtocolError>, String, Cid) {
        let remote = PeerforgeRemote::new(store.clone(), audit.clone(), root);
        let session = Session::new(self.repo.clone(), self.tracker.clone());
        let mut protocol = Protocol::new(remote, session).unwrap();

        let mut output = Vec::new();
        let result = protocol.run(input.as_bytes(), &mut output);
        let root = *protocol.handler().root();
        (result, String::from_utf8(output).unwrap(), root)
    }
}

fn write_commit(repo: &dyn ObjectRepository, files: Vec<(&str, GitObject)>) -> ObjectId {
    let mut entries = Vec::new();
    for (name, blob) in files {
        entries.push(TreeEntry::new("100644", name, blob.id));
        repo.write_object(&blob).unwrap();
    }
    let tree = GitObject::tree(entries);
    let commit = GitObject::commit(&tree.id, &[], SIGNATURE, SIGNATURE, "Initial commit\n");
    repo.write_object(&tree).unwrap();
    repo.write_object(&commit).unwrap()
}

fn empty_root() -> Cid {
    MemoryStore::empty_root().unwrap()
}

#[test]
fn test_capabilities_session() {
    let (client, _) = Client::memory();
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAudit::new());

    let (result, output, _) = client.session(&store, &audit, empty_root(), "capabilities\n\n");
    result.unwrap();
    assert_eq!(output, "push\nfetch\n\n");
}

#[test]
fn test_list_on_empty_remote() {
    let (client, _) = Client::memory();
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAudit::new());

    let (result, output, root) = client.session(&store, &audit, empty_root(), "list\n\n");
    result.unwrap();
    assert_eq!(output, "\n");
    assert_eq!(root, empty_root());
}

#[test]
fn test_push_then_list_in_new_session() {
    let (client, repo) = Client::memory();
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAudit::new());
    let head = write_commit(repo.as_ref(), vec![("README", GitObject::blob(b"hi\n".to_vec()))]);
    repo.set_ref("refs/heads/main", head);

    let (result, output, root) = client.session(
        &store,
        &audit,
        empty_root(),
        "push refs/heads/main:refs/heads/main\n\n",
    );
    result.unwrap();
    assert_eq!(output, "ok refs/heads/main\n\n");
    assert_eq!(audit.events().len(), 1);

    let (result, output, _) = client.session(&store, &audit, root, "list\n\n");
    result.unwrap();
    assert_eq!(
        output,
        format!("@refs/heads/main HEAD\n{} refs/heads/main\n\n", head)
    );

    let (result, output, _) = client.session(&store, &audit, root, "list for-push\n\n");
    result.unwrap();
    assert_eq!(output, format!("{} refs/heads/main\n\n", head));
}

#[test]
fn test_clone_with_large_object() {
    let (pusher, repo) = Client::memory();
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAudit::new());
    let large = GitObject::blob(vec![b'x'; LARGE_OBJECT_THRESHOLD + 1]);
    let small = GitObject::blob(b"small\n".to_vec());
    let head = write_commit(
        repo.as_ref(),
        vec![("big.bin", large.clone()), ("small.txt", small.clone())],
    );
    repo.set_ref("refs/heads/main", head);

    let (result, _, root) = pusher.session(
        &store,
        &audit,
        empty_root(),
        "push refs/heads/main:refs/heads/main\n\n",
    );
    result.unwrap();
    assert!(pusher.tracker.get(&lobj_key(&large.id)).unwrap().is_some());

    let (cloner, cloned) = Client::memory();
    let input = format!("list\nfetch {} refs/heads/main\n\n", head);
    let (result, output, _) = cloner.session(&store, &audit, root, &input);
    result.unwrap();
    assert_eq!(
        output,
        format!("@refs/heads/main HEAD\n{} refs/heads/main\n\n\n", head)
    );

    assert_eq!(cloned.read_object(&large.id).unwrap(), Some(large.clone()));
    assert_eq!(cloned.read_object(&small.id).unwrap(), Some(small));
    assert_eq!(cloner.tracker.get_ref("refs/heads/main").unwrap(), Some(head));
    assert!(cloner.tracker.get(&lobj_key(&large.id)).unwrap().is_some());
}

#[test]
fn test_unknown_command_leaves_remote_untouched() {
    let (client, repo) = Client::memory();
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAudit::new());
    let head = write_commit(repo.as_ref(), vec![("a", GitObject::blob(b"a".to_vec()))]);
    repo.set_ref("refs/heads/main", head);

    let (result, output, root) = client.session(
        &store,
        &audit,
        empty_root(),
        "push refs/heads/main:refs/heads/main\nfrobnicate\n\n",
    );
    assert!(matches!(result, Err(ProtocolError::UnknownCommand(_))));
    assert_eq!(output, "");
    assert_eq!(root, empty_root());
    assert!(audit.events().is_empty());
}

#[test]
fn test_push_from_git_repository() {
    let dir = TempDir::new().unwrap();
    let git = git2::Repository::init(dir.path()).unwrap();
    let repo = Arc::new(Git2Repository::open(dir.path()).unwrap());

    let head = write_commit(
        repo.as_ref(),
        vec![("hello.txt", GitObject::blob(b"hello\n".to_vec()))],
    );
    git.reference(
        "refs/heads/main",
        git2::Oid::from_bytes(head.as_bytes()).unwrap(),
        true,
        "test",
    )
    .unwrap();

    let client = Client {
        repo,
        tracker: Arc::new(MemoryTracker::new()),
    };
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAudit::new());

    let (result, output, root) = client.session(
        &store,
        &audit,
        empty_root(),
        "capabilities\nlist for-push\npush refs/heads/main:refs/heads/main\n\n",
    );
    result.unwrap();
    assert_eq!(
        output,
        format!(
            "push\nfetch\n\n{} refs/heads/main\n\nok refs/heads/main\n\n",
            ObjectId::ZERO
        )
    );
    assert_ne!(root, empty_root());

    let (cloner, cloned) = Client::memory();
    let input = format!("fetch {} refs/heads/main\n\n", head);
    let (result, _, _) = cloner.session(&store, &audit, root, &input);
    result.unwrap();
    assert!(cloned.contains(&head).unwrap());
}
