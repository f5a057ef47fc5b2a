//! In-memory object store shared by the integration tests
//!
//! Objects are addressed the way git addresses them (SHA-1 over
//! `"{kind} {len}\0{body}"`), refs update conditionally, and any operation
//! can be made to fail on its n-th call.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::object_store::{
    AccessToken, BlobEncoding, ObjectId, ObjectKind, ObjectStore, TreeEntry, TreeItem,
};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub fn token() -> AccessToken {
    AccessToken::new("ghp_integration")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ReadRef,
    ReadCommitTree,
    ListTree,
    ReadBlob,
    CreateBlob,
    CreateTree,
    CreateCommit,
    AdvanceRef,
}

#[derive(Debug, Clone)]
enum Object {
    Blob(Bytes),
    /// Flat map of full file paths to blob ids
    Tree(BTreeMap<String, ObjectId>),
    Commit {
        tree: ObjectId,
        parents: Vec<ObjectId>,
        message: String,
    },
}

#[derive(Default)]
struct State {
    objects: HashMap<ObjectId, Object>,
    refs: HashMap<String, ObjectId>,
    calls: HashMap<Op, usize>,
    /// Operation -> 1-based call number that fails
    failures: HashMap<Op, usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn object_id(kind: &str, body: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(format!("{} {}\0", kind, body.len()).as_bytes());
    hasher.update(body);
    ObjectId::parse(&hex::encode(hasher.finalize())).expect("sha1 hex is a valid object id")
}

fn tree_id(files: &BTreeMap<String, ObjectId>) -> ObjectId {
    let body: String = files
        .iter()
        .map(|(path, id)| format!("{}\0{}\n", path, id))
        .collect();
    object_id("tree", body.as_bytes())
}

impl MemoryStore {
    /// Store with `branch` pointing at a root commit containing `files`.
    pub fn with_files(branch: &str, files: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            let mut tree = BTreeMap::new();
            for (path, content) in files {
                let content = Bytes::copy_from_slice(content.as_bytes());
                let id = object_id("blob", &content);
                state.objects.insert(id.clone(), Object::Blob(content));
                tree.insert(path.to_string(), id);
            }
            let root_tree = tree_id(&tree);
            state.objects.insert(root_tree.clone(), Object::Tree(tree));

            let commit = Self::insert_commit(&mut state, "initial commit", &root_tree, &[]);
            state.refs.insert(branch.to_string(), commit);
        }
        store
    }

    fn insert_commit(
        state: &mut State,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> ObjectId {
        let mut body = format!("tree {}\n", tree);
        for parent in parents {
            body.push_str(&format!("parent {}\n", parent));
        }
        body.push('\n');
        body.push_str(message);

        let id = object_id("commit", body.as_bytes());
        state.objects.insert(
            id.clone(),
            Object::Commit {
                tree: tree.clone(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        id
    }

    /// Make the `nth` (1-based) call of `op` fail with `RemoteUnavailable`.
    pub fn fail_on(&self, op: Op, nth: usize) {
        self.state.lock().unwrap().failures.insert(op, nth);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    pub fn head(&self, branch: &str) -> ObjectId {
        self.state.lock().unwrap().refs[branch].clone()
    }

    /// File contents reachable from `commit`.
    pub fn files_at(&self, commit: &ObjectId) -> BTreeMap<String, Bytes> {
        let state = self.state.lock().unwrap();
        let Some(Object::Commit { tree, .. }) = state.objects.get(commit) else {
            panic!("{commit} is not a commit");
        };
        let Some(Object::Tree(files)) = state.objects.get(tree) else {
            panic!("{tree} is not a tree");
        };
        files
            .iter()
            .map(|(path, id)| match state.objects.get(id) {
                Some(Object::Blob(content)) => (path.clone(), content.clone()),
                _ => panic!("{path} does not point at a blob"),
            })
            .collect()
    }

    pub fn file_text(&self, commit: &ObjectId, path: &str) -> Option<String> {
        self.files_at(commit)
            .get(path)
            .map(|content| String::from_utf8_lossy(content).into_owned())
    }

    pub fn parents(&self, commit: &ObjectId) -> Vec<ObjectId> {
        match self.state.lock().unwrap().objects.get(commit) {
            Some(Object::Commit { parents, .. }) => parents.clone(),
            _ => panic!("{commit} is not a commit"),
        }
    }

    pub fn message(&self, commit: &ObjectId) -> String {
        match self.state.lock().unwrap().objects.get(commit) {
            Some(Object::Commit { message, .. }) => message.clone(),
            _ => panic!("{commit} is not a commit"),
        }
    }

    /// `commit` followed by every ancestor, first-parent order.
    pub fn ancestry(&self, commit: &ObjectId) -> Vec<ObjectId> {
        let mut chain = vec![commit.clone()];
        let mut current = commit.clone();
        while let Some(parent) = self.parents(&current).first().cloned() {
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Any commit object carrying `message`, reachable or not.
    pub fn find_commit(&self, message: &str) -> Option<ObjectId> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .find_map(|(id, object)| match object {
                Object::Commit { message: m, .. } if m == message => Some(id.clone()),
                _ => None,
            })
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    fn enter(&self, op: Op) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let count = state.calls.entry(op).or_insert(0);
        *count += 1;
        let count = *count;
        if state.failures.get(&op) == Some(&count) {
            return Err(BridgeError::RemoteUnavailable(format!(
                "injected failure on {:?} call {}",
                op, count
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create_blob(
        &self,
        _credential: &AccessToken,
        content: Bytes,
        _encoding: BlobEncoding,
    ) -> Result<ObjectId> {
        self.enter(Op::CreateBlob)?;
        let id = object_id("blob", &content);
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(id.clone(), Object::Blob(content));
        Ok(id)
    }

    async fn read_blob(&self, _credential: &AccessToken, blob_id: &ObjectId) -> Result<Bytes> {
        self.enter(Op::ReadBlob)?;
        match self.state.lock().unwrap().objects.get(blob_id) {
            Some(Object::Blob(content)) => Ok(content.clone()),
            _ => Err(BridgeError::NotFound(format!("blob {}", blob_id))),
        }
    }

    async fn read_ref(&self, _credential: &AccessToken, branch: &str) -> Result<ObjectId> {
        self.enter(Op::ReadRef)?;
        self.state
            .lock()
            .unwrap()
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("ref heads/{}", branch)))
    }

    async fn read_commit_tree(
        &self,
        _credential: &AccessToken,
        commit_id: &ObjectId,
    ) -> Result<ObjectId> {
        self.enter(Op::ReadCommitTree)?;
        match self.state.lock().unwrap().objects.get(commit_id) {
            Some(Object::Commit { tree, .. }) => Ok(tree.clone()),
            _ => Err(BridgeError::NotFound(format!("commit {}", commit_id))),
        }
    }

    async fn list_tree(
        &self,
        _credential: &AccessToken,
        tree_id: &ObjectId,
    ) -> Result<Vec<TreeItem>> {
        self.enter(Op::ListTree)?;
        let state = self.state.lock().unwrap();
        match state.objects.get(tree_id) {
            Some(Object::Tree(files)) => Ok(files
                .iter()
                .map(|(path, id)| TreeItem {
                    path: path.clone(),
                    kind: ObjectKind::Blob,
                    object_id: id.clone(),
                    size: match state.objects.get(id) {
                        Some(Object::Blob(content)) => Some(content.len() as u64),
                        _ => None,
                    },
                })
                .collect()),
            _ => Err(BridgeError::NotFound(format!("tree {}", tree_id))),
        }
    }

    async fn create_tree(
        &self,
        _credential: &AccessToken,
        entries: Vec<TreeEntry>,
        base_tree: &ObjectId,
    ) -> Result<ObjectId> {
        self.enter(Op::CreateTree)?;
        let mut state = self.state.lock().unwrap();
        let mut files = match state.objects.get(base_tree) {
            Some(Object::Tree(files)) => files.clone(),
            _ => return Err(BridgeError::NotFound(format!("tree {}", base_tree))),
        };

        for entry in entries {
            match entry.object_id {
                Some(id) => {
                    if !matches!(state.objects.get(&id), Some(Object::Blob(_))) {
                        return Err(BridgeError::OperationFailed(format!(
                            "{} references unknown blob {}",
                            entry.path, id
                        )));
                    }
                    files.insert(entry.path, id);
                }
                None => {
                    if files.remove(&entry.path).is_none() {
                        return Err(BridgeError::OperationFailed(format!(
                            "cannot delete missing path {}",
                            entry.path
                        )));
                    }
                }
            }
        }

        let id = tree_id(&files);
        state.objects.insert(id.clone(), Object::Tree(files));
        Ok(id)
    }

    async fn create_commit(
        &self,
        _credential: &AccessToken,
        message: &str,
        tree_id: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId> {
        self.enter(Op::CreateCommit)?;
        let mut state = self.state.lock().unwrap();
        if !matches!(state.objects.get(tree_id), Some(Object::Tree(_))) {
            return Err(BridgeError::NotFound(format!("tree {}", tree_id)));
        }
        Ok(Self::insert_commit(&mut state, message, tree_id, parents))
    }

    async fn advance_ref(
        &self,
        _credential: &AccessToken,
        branch: &str,
        from: &ObjectId,
        to: &ObjectId,
    ) -> Result<()> {
        self.enter(Op::AdvanceRef)?;
        let mut state = self.state.lock().unwrap();
        match state.refs.get(branch) {
            Some(current) if current == from => {
                state.refs.insert(branch.to_string(), to.clone());
                Ok(())
            }
            Some(current) => Err(BridgeError::Conflict(format!(
                "{} is at {}, expected {}",
                branch, current, from
            ))),
            None => Err(BridgeError::NotFound(format!("ref heads/{}", branch))),
        }
    }
}
