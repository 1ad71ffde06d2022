//! Domain events carried by the transport, with their JSON payloads.

use agora_core::{CoreError, EntityType, EventError, PostId, UserId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

pub const POST_PUBLISHED: &str = "post.published";
pub const POST_DELETED: &str = "post.deleted";
pub const VOTE_CREATED: &str = "vote.created";
pub const VOTE_UPDATED: &str = "vote.updated";
pub const VOTE_DELETED: &str = "vote.deleted";
pub const COMMENT_CREATED: &str = "comment.created";
pub const COMMENT_UPDATED: &str = "comment.updated";
pub const COMMENT_DELETED: &str = "comment.deleted";

pub const ALL_TOPICS: [&str; 8] = [
    POST_PUBLISHED,
    POST_DELETED,
    VOTE_CREATED,
    VOTE_UPDATED,
    VOTE_DELETED,
    COMMENT_CREATED,
    COMMENT_UPDATED,
    COMMENT_DELETED,
];

/// A message as it travels through the transport: a topic and an undecoded body.
///
/// Redelivered messages keep their id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    pub id: Uuid,
    pub topic: String,
    pub payload: String,
}

impl EventMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPublished {
    pub post_id: PostId,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDeleted {
    pub post_id: PostId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    #[serde(default)]
    pub vote_id: Option<i64>,
    pub user_id: UserId,
    pub entity_type: EntityType,
    pub entity_id: i64,
    /// +1 or -1
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub comment_id: i64,
    pub post_id: PostId,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    PostPublished(PostPublished),
    PostDeleted(PostDeleted),
    Vote(ChangeKind, VoteEvent),
    Comment(ChangeKind, CommentEvent),
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::PostPublished(_) => POST_PUBLISHED,
            DomainEvent::PostDeleted(_) => POST_DELETED,
            DomainEvent::Vote(ChangeKind::Created, _) => VOTE_CREATED,
            DomainEvent::Vote(ChangeKind::Updated, _) => VOTE_UPDATED,
            DomainEvent::Vote(ChangeKind::Deleted, _) => VOTE_DELETED,
            DomainEvent::Comment(ChangeKind::Created, _) => COMMENT_CREATED,
            DomainEvent::Comment(ChangeKind::Updated, _) => COMMENT_UPDATED,
            DomainEvent::Comment(ChangeKind::Deleted, _) => COMMENT_DELETED,
        }
    }

    /// The post whose score this event can change. Votes on comments affect no post.
    pub fn scored_post(&self) -> Option<PostId> {
        match self {
            DomainEvent::Vote(_, vote) if vote.entity_type == EntityType::Post => {
                Some(vote.entity_id)
            }
            DomainEvent::Comment(_, comment) => Some(comment.post_id),
            _ => None,
        }
    }

    pub fn decode(message: &EventMessage) -> Result<Self, EventError> {
        let topic = message.topic.as_str();
        let event = match topic {
            POST_PUBLISHED => DomainEvent::PostPublished(payload(message)?),
            POST_DELETED => DomainEvent::PostDeleted(payload(message)?),
            VOTE_CREATED => DomainEvent::Vote(ChangeKind::Created, payload(message)?),
            VOTE_UPDATED => DomainEvent::Vote(ChangeKind::Updated, payload(message)?),
            VOTE_DELETED => DomainEvent::Vote(ChangeKind::Deleted, payload(message)?),
            COMMENT_CREATED => DomainEvent::Comment(ChangeKind::Created, payload(message)?),
            COMMENT_UPDATED => DomainEvent::Comment(ChangeKind::Updated, payload(message)?),
            COMMENT_DELETED => DomainEvent::Comment(ChangeKind::Deleted, payload(message)?),
            _ => {
                return Err(EventError::UnknownTopic {
                    topic: topic.to_string(),
                })
            }
        };
        Ok(event)
    }

    pub fn encode(&self) -> Result<EventMessage, CoreError> {
        let payload = match self {
            DomainEvent::PostPublished(e) => serde_json::to_string(e)?,
            DomainEvent::PostDeleted(e) => serde_json::to_string(e)?,
            DomainEvent::Vote(_, e) => serde_json::to_string(e)?,
            DomainEvent::Comment(_, e) => serde_json::to_string(e)?,
        };
        Ok(EventMessage::new(self.topic(), payload))
    }
}

fn payload<T: DeserializeOwned>(message: &EventMessage) -> Result<T, EventError> {
    serde_json::from_str(&message.payload).map_err(|e| EventError::MalformedPayload {
        topic: message.topic.clone(),
        reason: e.to_string(),
    })
}
