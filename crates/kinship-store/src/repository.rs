//! Whole-graph persistence over a [`KeyValueStore`].
//!
//! Every aggregate root gets its own key: `user/<id>`, `post/<id>` (with its
//! comment and reply lines) and `conversation/<id>` (with its message
//! lines). A `manifest` blob lists those keys and the next value of every id
//! allocator, so a loaded graph keeps handing out fresh ids.

use kinship_shared::{Error, Result};
use kinship_social::codec::split_record;
use kinship_social::{Conversation, IdAllocators, Message, NextIds, Post, Record, SocialGraph, User};
use tracing::info;

use crate::kv::KeyValueStore;

pub const MANIFEST_KEY: &str = "manifest";

const NEXT_IDS_KIND: &str = "next";

pub struct GraphRepository<S> {
    store: S,
}

impl<S: KeyValueStore> GraphRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Write every aggregate, then the manifest, then drop keys that only
    /// the previous manifest listed.
    pub fn save_graph(&mut self, graph: &SocialGraph) -> Result<()> {
        let previous = if self.store.exists(MANIFEST_KEY)? {
            parse_manifest(&self.store.load(MANIFEST_KEY)?)?.1
        } else {
            Vec::new()
        };

        let mut keys = Vec::new();
        for user in graph.users() {
            keys.push(self.put(format!("user/{}", user.id()), user)?);
        }
        for post in graph.posts() {
            keys.push(self.put(format!("post/{}", post.id()), post)?);
        }
        for conversation in graph.conversations() {
            keys.push(self.put(format!("conversation/{}", conversation.id()), conversation)?);
        }

        self.store
            .save(MANIFEST_KEY, &encode_manifest(graph.next_ids(), &keys))?;

        let mut stale = 0usize;
        for key in previous.iter().filter(|key| !keys.contains(*key)) {
            if self.store.delete(key)? {
                stale += 1;
            }
        }

        info!(
            users = graph.users().count(),
            posts = graph.posts().count(),
            conversations = graph.conversations().count(),
            stale,
            "saved graph"
        );
        Ok(())
    }

    /// Rebuild a graph with default collaborators.
    pub fn load_graph(&self) -> Result<SocialGraph> {
        self.load_into(SocialGraph::new())
    }

    /// Fill `graph`, which should be empty, from the store and resume its
    /// allocators. Use this to keep a custom hasher or clock.
    pub fn load_into(&self, graph: SocialGraph) -> Result<SocialGraph> {
        let (next, keys) = parse_manifest(&self.store.load(MANIFEST_KEY)?)?;
        let mut graph = graph.with_allocators(IdAllocators::resume(next));

        for key in &keys {
            let blob = self.store.load(key)?;
            match key.split_once('/').map(|(kind, _)| kind) {
                Some("user") => graph.insert_user(User::decode(&blob)?)?,
                Some("post") => graph.insert_post(Post::decode(&blob)?)?,
                Some("conversation") => {
                    graph.insert_conversation(Conversation::<Message>::decode(&blob)?)?
                }
                _ => {
                    return Err(Error::validation(format!(
                        "Unknown key {key:?} in manifest"
                    )))
                }
            }
        }

        info!(keys = keys.len(), "loaded graph");
        Ok(graph)
    }

    fn put<R: Record>(&mut self, key: String, record: &R) -> Result<String> {
        self.store.save(&key, &record.encode())?;
        Ok(key)
    }
}

fn encode_manifest(next: NextIds, keys: &[String]) -> String {
    let mut lines = vec![format!(
        "{NEXT_IDS_KIND}|{}|{}|{}|{}|{}",
        next.users, next.posts, next.comments, next.replies, next.conversations
    )];
    lines.extend(keys.iter().cloned());
    lines.join("\n")
}

fn parse_manifest(text: &str) -> Result<(NextIds, Vec<String>)> {
    let mut lines = text.lines().filter(|line| !line.is_empty());
    let head = lines
        .next()
        .ok_or_else(|| Error::validation("Empty manifest"))?;
    let fields = split_record(head)?;
    if fields.len() != 6 || fields[0] != NEXT_IDS_KIND {
        return Err(Error::validation("Malformed manifest header"));
    }
    let counter = |i: usize| {
        fields[i]
            .parse::<i64>()
            .map_err(|_| Error::validation(format!("Invalid id counter: {:?}", fields[i])))
    };
    let next = NextIds {
        users: counter(1)?,
        posts: counter(2)?,
        comments: counter(3)?,
        replies: counter(4)?,
        conversations: counter(5)?,
    };
    Ok((next, lines.map(str::to_string).collect()))
}
