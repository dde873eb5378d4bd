//! IPFS (Kubo) RPC client.
//!
//! Speaks the `/api/v0` HTTP API. Path lookups are resolved link by link
//! with `ls`, so a missing name is detected from the directory listing
//! rather than from the wording of an error message. Raw blocks have no
//! listing; a `block/get` the node answers with a not-found error is
//! reported as absent.

use crate::store::split_path;
use crate::{ContentStore, Link, NodeKind, Result, StoreError};
use bytes::Bytes;
use cid::Cid;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Error body returned by the RPC API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct DagPutResponse {
    #[serde(rename = "Cid")]
    cid: CidLink,
}

#[derive(Debug, Deserialize)]
struct CidLink {
    #[serde(rename = "/")]
    link: String,
}

#[derive(Debug, Deserialize)]
struct PatchResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct LsResponse {
    #[serde(rename = "Objects", default)]
    objects: Vec<LsObject>,
}

#[derive(Debug, Deserialize)]
struct LsObject {
    #[serde(rename = "Links", default)]
    links: Vec<LsLink>,
}

#[derive(Debug, Deserialize)]
struct LsLink {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Type", default = "unknown_type")]
    kind: i32,
}

fn unknown_type() -> i32 {
    -1
}

/// Content store backed by an IPFS node's RPC API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base: String,
}

impl HttpStore {
    /// Creates a client for the node at `endpoint` (`host:port` or a URL).
    ///
    /// Requests have no deadline unless `timeout` is given.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/');
        let base = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn call(&self, command: &str, query: &[(&str, String)], form: Option<Form>) -> Result<Response> {
        let url = format!("{}/api/v0/{}", self.base, command);
        tracing::trace!(%url, ?query, "ipfs rpc");

        let mut request = self.client.post(&url).query(query);
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request.send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn call_json<T: DeserializeOwned>(
        &self,
        command: &str,
        query: &[(&str, String)],
        form: Option<Form>,
    ) -> Result<T> {
        let body = self.call(command, query, form)?.bytes()?;
        serde_json::from_slice(&body).map_err(|e| StoreError::Decode(format!("{}: {}", command, e)))
    }

    fn file_form(data: &[u8]) -> Form {
        Form::new().part("file", Part::bytes(data.to_vec()).file_name("data"))
    }

    fn ls(&self, cid: &Cid) -> Result<Vec<Link>> {
        let response: LsResponse = self.call_json(
            "ls",
            &[("arg", cid.to_string()), ("resolve-type", "true".to_string())],
            None,
        )?;

        let mut links = Vec::new();
        for object in response.objects {
            for link in object.links {
                links.push(Link {
                    name: link.name,
                    cid: Cid::try_from(link.hash.as_str())?,
                    kind: NodeKind::from_unixfs_type(link.kind)?,
                });
            }
        }
        Ok(links)
    }
}

impl ContentStore for HttpStore {
    fn put(&self, data: &[u8], input_codec: &str, store_codec: &str) -> Result<Cid> {
        let mut query = vec![
            ("input-codec", input_codec.to_string()),
            ("store-codec", store_codec.to_string()),
            ("pin", "false".to_string()),
        ];
        if store_codec == "git-raw" {
            // git objects are addressed by their sha1
            query.push(("hash", "sha1".to_string()));
        }

        let response: DagPutResponse =
            self.call_json("dag/put", &query, Some(Self::file_form(data)))?;
        Ok(Cid::try_from(response.cid.link.as_str())?)
    }

    fn add(&self, data: &[u8]) -> Result<Cid> {
        let response: AddResponse = self.call_json(
            "add",
            &[("pin", "true".to_string()), ("quieter", "true".to_string())],
            Some(Self::file_form(data)),
        )?;
        Ok(Cid::try_from(response.hash.as_str())?)
    }

    fn patch_link(&self, root: &Cid, path: &str, child: &Cid, create: bool) -> Result<Cid> {
        let response: PatchResponse = self.call_json(
            "object/patch/add-link",
            &[
                ("arg", root.to_string()),
                ("arg", path.trim_matches('/').to_string()),
                ("arg", child.to_string()),
                ("create", create.to_string()),
            ],
            None,
        )?;
        Ok(Cid::try_from(response.hash.as_str())?)
    }

    fn list(&self, path: &str) -> Result<Option<Vec<Link>>> {
        match self.resolve(path)? {
            Some(cid) => Ok(Some(self.ls(&cid)?)),
            None => Ok(None),
        }
    }

    fn read_bytes(&self, path: &str) -> Result<Option<Bytes>> {
        let Some(cid) = self.resolve(path)? else {
            return Ok(None);
        };
        let response = self.call("cat", &[("arg", format!("/ipfs/{}", cid))], None)?;
        Ok(Some(response.bytes()?))
    }

    fn resolve(&self, path: &str) -> Result<Option<Cid>> {
        let (mut current, segments) = split_path(path)?;
        for segment in segments {
            let links = self.ls(&current)?;
            match links.into_iter().find(|link| link.name == segment) {
                Some(link) => current = link.cid,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn get_block(&self, cid: &Cid) -> Result<Option<Bytes>> {
        match self.call("block/get", &[("arg", cid.to_string())], None) {
            Ok(response) => Ok(Some(response.bytes()?)),
            Err(StoreError::Api { message, .. }) if is_not_found(&message) => {
                tracing::debug!(%cid, %message, "Block not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Matches the messages Kubo reports for blocks it cannot find.
fn is_not_found(message: &str) -> bool {
    message.contains("not found") || message.contains("could not find")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EMPTY_DIR;
    use pfg_storage::{cid_from_object_id, ObjectId};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_cid(byte: u8) -> Cid {
        cid_from_object_id(&ObjectId::from_bytes([byte; 20])).unwrap()
    }

    /// Runs `f` against a blocking client pointed at `server`.
    async fn with_store<T, F>(server: &MockServer, f: F) -> T
    where
        F: FnOnce(HttpStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            f(HttpStore::new(&uri, Some(Duration::from_secs(5))).unwrap())
        })
        .await
        .unwrap()
    }

    /// Serves a root directory holding a single `HEAD` file.
    async fn mount_root_listing(server: &MockServer, head: &Cid) {
        Mock::given(method("POST"))
            .and(path("/api/v0/ls"))
            .and(query_param("arg", EMPTY_DIR))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Objects": [{
                    "Hash": EMPTY_DIR,
                    "Links": [{"Name": "HEAD", "Hash": head.to_string(), "Size": 15, "Type": 2}]
                }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_missing_link_is_none() {
        let server = MockServer::start().await;
        let head = test_cid(1);
        mount_root_listing(&server, &head).await;

        let (missing, found, listed) = with_store(&server, |store| {
            (
                store.resolve(&format!("{}/refs/heads/main", EMPTY_DIR)).unwrap(),
                store.resolve(&format!("{}/HEAD", EMPTY_DIR)).unwrap(),
                store.list(&format!("{}/objects", EMPTY_DIR)).unwrap(),
            )
        })
        .await;

        assert!(missing.is_none());
        assert_eq!(found, Some(head));
        assert!(listed.is_none());
    }

    #[tokio::test]
    async fn test_read_bytes_uses_cat() {
        let server = MockServer::start().await;
        let head = test_cid(1);
        mount_root_listing(&server, &head).await;
        Mock::given(method("POST"))
            .and(path("/api/v0/cat"))
            .and(query_param("arg", format!("/ipfs/{}", head)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"refs/heads/main".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let value = with_store(&server, |store| {
            store.read_bytes(&format!("{}/HEAD", EMPTY_DIR)).unwrap()
        })
        .await;
        assert_eq!(value, Some(Bytes::from_static(b"refs/heads/main")));
    }

    #[tokio::test]
    async fn test_error_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/cat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "Message": "context deadline exceeded",
                "Code": 0,
                "Type": "error"
            })))
            .mount(&server)
            .await;

        let result = with_store(&server, |store| store.read_bytes(EMPTY_DIR)).await;
        match result {
            Err(StoreError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "context deadline exceeded");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_patch_link_query() {
        let server = MockServer::start().await;
        let child = test_cid(1);
        let patched = test_cid(2);
        Mock::given(method("POST"))
            .and(path("/api/v0/object/patch/add-link"))
            .and(query_param("arg", EMPTY_DIR))
            .and(query_param("arg", "refs/heads/main"))
            .and(query_param("arg", child.to_string()))
            .and(query_param("create", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Hash": patched.to_string()})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let root = Cid::try_from(EMPTY_DIR).unwrap();
        let result = with_store(&server, move |store| {
            store.patch_link(&root, "/refs/heads/main", &child, true)
        })
        .await;
        assert_eq!(result.unwrap(), patched);
    }

    #[tokio::test]
    async fn test_dag_put_git_raw_is_sha1_addressed() {
        let server = MockServer::start().await;
        let stored = test_cid(3);
        Mock::given(method("POST"))
            .and(path("/api/v0/dag/put"))
            .and(query_param("input-codec", "raw"))
            .and(query_param("store-codec", "git-raw"))
            .and(query_param("hash", "sha1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Cid": {"/": stored.to_string()}})),
            )
            .mount(&server)
            .await;

        let result = with_store(&server, |store| store.put(b"blob 1\0x", "raw", "git-raw")).await;
        assert_eq!(result.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_get_block_absent() {
        let server = MockServer::start().await;
        let missing = test_cid(4);
        Mock::given(method("POST"))
            .and(path("/api/v0/block/get"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "Message": format!("block was not found locally (offline): ipld: could not find {}", missing),
                "Code": 0,
                "Type": "error"
            })))
            .mount(&server)
            .await;

        let result = with_store(&server, move |store| store.get_block(&missing)).await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_block_returns_data() {
        let server = MockServer::start().await;
        let block = test_cid(5);
        Mock::given(method("POST"))
            .and(path("/api/v0/block/get"))
            .and(query_param("arg", block.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"blob 1\0x".to_vec()))
            .mount(&server)
            .await;

        let result = with_store(&server, move |store| store.get_block(&block)).await;
        assert_eq!(result.unwrap(), Some(Bytes::from_static(b"blob 1\0x")));
    }

    #[test]
    fn test_not_found_messages() {
        assert!(is_not_found("block was not found locally (offline)"));
        assert!(is_not_found("ipld: could not find bafk"));
        assert!(!is_not_found("context deadline exceeded"));
    }

    #[test]
    fn test_endpoint_normalization() {
        let store = HttpStore::new("localhost:5001", None).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5001");

        let store = HttpStore::new("https://ipfs.example.com/", None).unwrap();
        assert_eq!(store.base_url(), "https://ipfs.example.com");
    }

    #[test]
    fn test_ls_response_decoding() {
        let body = r#"{"Objects":[{"Hash":"QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn","Links":[
            {"Name":"HEAD","Hash":"QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn","Size":15,"Type":2},
            {"Name":"refs","Hash":"QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn","Size":0,"Type":1}
        ]}]}"#;
        let response: LsResponse = serde_json::from_str(body).unwrap();
        let links = &response.objects[0].links;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name, "HEAD");
        assert_eq!(links[0].kind, 2);
        assert_eq!(links[1].kind, 1);
    }

    #[test]
    fn test_dag_put_response_decoding() {
        let body = r#"{"Cid":{"/":"baf4bcfgoafrsmmivycqpbytfv3xzfcwglsr7zeq"}}"#;
        let response: DagPutResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.cid.link, "baf4bcfgoafrsmmivycqpbytfv3xzfcwglsr7zeq");
    }

    #[test]
    fn test_error_body_decoding() {
        let body = r#"{"Message":"merkledag: not found","Code":0,"Type":"error"}"#;
        let error: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(error.message, "merkledag: not found");
    }
}
