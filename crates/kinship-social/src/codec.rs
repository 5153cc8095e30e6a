//! Line-oriented text records for every entity.
//!
//! One line per record, fields separated by `|`, the first field naming the
//! record kind. Aggregates span several lines: a post is followed by its
//! comment lines, each comment by its reply lines, a conversation by its
//! message lines. Text fields escape `\`, `|`, `\n` and `\r` with a
//! backslash so a line never contains a raw separator or line break.

use std::str::FromStr;

use kinship_shared::constants::{FIELD_SEPARATOR, LIST_SEPARATOR, PAIR_SEPARATOR};
use kinship_shared::{
    CommentId, ConversationId, Error, PostId, ReplyId, Result, Timestamp, UserId,
};

use crate::comment::Comment;
use crate::conversation::Conversation;
use crate::message::Message;
use crate::post::{Post, Privacy, ReactionKind};
use crate::reply::Reply;
use crate::user::User;

/// An entity with a text record form.
pub trait Record: Sized {
    /// Leading field of every line this record starts with.
    const KIND: &'static str;

    fn encode(&self) -> String;

    /// Parse a record, re-running the entity's own validation.
    fn decode(text: &str) -> Result<Self>;
}

pub fn escape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Split one line on unescaped separators and unescape every field.
pub fn split_record(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some('|') => current.push('|'),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => {
                    return Err(Error::validation(format!("Unknown escape sequence \\{other}")))
                }
                None => return Err(Error::validation("Dangling escape at end of record")),
            },
            c if c == FIELD_SEPARATOR => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    Ok(fields)
}

// ----------------------------------------------------------------------
// Field helpers
// ----------------------------------------------------------------------

fn join_fields(fields: &[String]) -> String {
    fields.join(FIELD_SEPARATOR.to_string().as_str())
}

/// Split `line` and check its kind and arity.
fn fields_of(line: &str, kind: &str, arity: usize) -> Result<Vec<String>> {
    let fields = split_record(line)?;
    if fields.first().map(String::as_str) != Some(kind) {
        return Err(Error::validation(format!("Expected a {kind} record")));
    }
    if fields.len() != arity + 1 {
        return Err(Error::validation(format!(
            "Malformed {kind} record: expected {arity} fields, found {}",
            fields.len() - 1
        )));
    }
    Ok(fields)
}

fn record_kind(line: &str) -> &str {
    line.split(FIELD_SEPARATOR).next().unwrap_or_default()
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.is_empty())
}

fn single_line(text: &str, kind: &str) -> Result<String> {
    let mut lines = non_empty_lines(text);
    let line = lines
        .next()
        .ok_or_else(|| Error::validation(format!("Empty {kind} record")))?;
    if lines.next().is_some() {
        return Err(Error::validation(format!("Trailing data after {kind} record")));
    }
    Ok(line.to_string())
}

fn parse_int<T: FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::validation(format!("Invalid {what}: {field:?}")))
}

fn parse_flag(field: &str, what: &str) -> Result<bool> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(Error::validation(format!("Invalid {what}: {field:?}"))),
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn parse_timestamp(field: &str) -> Result<Timestamp> {
    field.parse()
}

fn list_items(field: &str) -> impl Iterator<Item = &str> {
    field.split(LIST_SEPARATOR).filter(|item| !item.is_empty())
}

fn encode_ids<I>(ids: I) -> String
where
    I: IntoIterator<Item = UserId>,
{
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR.to_string().as_str())
}

fn parse_ids<T: From<i64>>(field: &str, what: &str) -> Result<Vec<T>> {
    list_items(field)
        .map(|item| parse_int::<i64>(item, what).map(T::from))
        .collect()
}

fn encode_pairs<I>(pairs: I) -> String
where
    I: IntoIterator<Item = (UserId, String)>,
{
    pairs
        .into_iter()
        .map(|(id, value)| format!("{id}{PAIR_SEPARATOR}{value}"))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR.to_string().as_str())
}

fn parse_pairs<'a>(field: &'a str, what: &str) -> Result<Vec<(UserId, &'a str)>> {
    list_items(field)
        .map(|item| {
            let (id, value) = item
                .split_once(PAIR_SEPARATOR)
                .ok_or_else(|| Error::validation(format!("Invalid {what}: {item:?}")))?;
            Ok((UserId(parse_int(id, what)?), value))
        })
        .collect()
}

// ----------------------------------------------------------------------
// Records
// ----------------------------------------------------------------------

impl Record for User {
    const KIND: &'static str = "user";

    fn encode(&self) -> String {
        let friends = encode_pairs(
            self.friendships()
                .map(|(id, restricted)| (id, flag(restricted).to_string())),
        );
        let posts = self
            .posts()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR.to_string().as_str());
        join_fields(&[
            Self::KIND.to_string(),
            self.id().to_string(),
            escape_field(self.email()),
            escape_field(self.name()),
            escape_field(self.password_hash()),
            escape_field(self.gender()),
            self.birthdate().to_string(),
            friends,
            posts,
        ])
    }

    fn decode(text: &str) -> Result<Self> {
        let line = single_line(text, Self::KIND)?;
        let f = fields_of(&line, Self::KIND, 8)?;
        let mut user = User::from_stored(
            UserId(parse_int(&f[1], "user ID")?),
            f[2].clone(),
            f[3].clone(),
            f[4].clone(),
            f[5].clone(),
            parse_timestamp(&f[6])?,
        )?;
        for (friend, restricted) in parse_pairs(&f[7], "friend entry")? {
            user.restore_friend(friend, parse_flag(restricted, "friend flag")?)?;
        }
        for post in parse_ids::<PostId>(&f[8], "post ID")? {
            user.restore_post(post)?;
        }
        Ok(user)
    }
}

impl Record for Reply {
    const KIND: &'static str = "reply";

    fn encode(&self) -> String {
        join_fields(&[
            Self::KIND.to_string(),
            self.id().to_string(),
            self.comment_id().to_string(),
            self.author_id().to_string(),
            self.timestamp().to_string(),
            escape_field(self.content()),
            encode_ids(self.likes().iter()),
        ])
    }

    fn decode(text: &str) -> Result<Self> {
        decode_reply(&single_line(text, Self::KIND)?)
    }
}

fn decode_reply(line: &str) -> Result<Reply> {
    let f = fields_of(line, Reply::KIND, 6)?;
    let mut reply = Reply::new(
        ReplyId(parse_int(&f[1], "reply ID")?),
        UserId(parse_int(&f[3], "author ID")?),
        CommentId(parse_int(&f[2], "comment ID")?),
        f[5].clone(),
        parse_timestamp(&f[4])?,
    )?;
    for liker in parse_ids::<UserId>(&f[6], "liker ID")? {
        reply.add_like(liker)?;
    }
    Ok(reply)
}

impl Record for Comment {
    const KIND: &'static str = "comment";

    /// The comment line followed by one line per reply.
    fn encode(&self) -> String {
        let mut lines = vec![encode_comment_line(self)];
        lines.extend(self.replies().iter().map(Record::encode));
        lines.join("\n")
    }

    fn decode(text: &str) -> Result<Self> {
        let mut lines = non_empty_lines(text);
        let head = lines
            .next()
            .ok_or_else(|| Error::validation("Empty comment record"))?;
        let mut comment = decode_comment_line(head)?;
        for line in lines {
            comment.add_reply(decode_reply(line)?)?;
        }
        Ok(comment)
    }
}

fn encode_comment_line(comment: &Comment) -> String {
    join_fields(&[
        Comment::KIND.to_string(),
        comment.id().to_string(),
        comment.author_id().to_string(),
        comment.timestamp().to_string(),
        escape_field(comment.content()),
        encode_ids(comment.likes().iter()),
    ])
}

fn decode_comment_line(line: &str) -> Result<Comment> {
    let f = fields_of(line, Comment::KIND, 5)?;
    let mut comment = Comment::new(
        CommentId(parse_int(&f[1], "comment ID")?),
        UserId(parse_int(&f[2], "author ID")?),
        f[4].clone(),
        parse_timestamp(&f[3])?,
    )?;
    for liker in parse_ids::<UserId>(&f[5], "liker ID")? {
        comment.add_like(liker)?;
    }
    Ok(comment)
}

impl Record for Post {
    const KIND: &'static str = "post";

    /// The post line followed by every comment record in thread order.
    fn encode(&self) -> String {
        let reactions = encode_pairs(
            self.reactions()
                .map(|(id, kind)| (id, kind.code().to_string())),
        );
        let head = join_fields(&[
            Self::KIND.to_string(),
            self.id().to_string(),
            self.author_id().to_string(),
            self.privacy().code().to_string(),
            self.timestamp().to_string(),
            escape_field(self.content()),
            encode_ids(self.tagged_users()),
            encode_ids(self.likes().iter()),
            reactions,
        ]);
        let mut lines = vec![head];
        lines.extend(self.comments().iter().map(Record::encode));
        lines.join("\n")
    }

    fn decode(text: &str) -> Result<Self> {
        let mut lines = non_empty_lines(text);
        let head = lines
            .next()
            .ok_or_else(|| Error::validation("Empty post record"))?;
        let f = fields_of(head, Self::KIND, 8)?;
        let privacy = parse_int::<u8>(&f[3], "privacy")
            .ok()
            .and_then(Privacy::from_code)
            .ok_or_else(|| Error::validation(format!("Invalid privacy: {:?}", f[3])))?;
        let mut post = Post::new(
            PostId(parse_int(&f[1], "post ID")?),
            UserId(parse_int(&f[2], "author ID")?),
            f[5].clone(),
            parse_timestamp(&f[4])?,
            privacy,
        )?;
        for user in parse_ids::<UserId>(&f[6], "tagged user ID")? {
            post.tag_user(user)?;
        }
        for liker in parse_ids::<UserId>(&f[7], "liker ID")? {
            post.add_like(liker)?;
        }
        for (user, code) in parse_pairs(&f[8], "reaction")? {
            let kind = parse_int::<u8>(code, "reaction")
                .ok()
                .and_then(ReactionKind::from_code)
                .ok_or_else(|| Error::validation(format!("Invalid reaction: {code:?}")))?;
            post.react(user, kind)?;
        }

        // Replies attach to the most recent comment line.
        let mut pending: Option<Comment> = None;
        for line in lines {
            match record_kind(line) {
                "comment" => {
                    if let Some(done) = pending.replace(decode_comment_line(line)?) {
                        post.add_comment(done)?;
                    }
                }
                "reply" => {
                    let comment = pending
                        .as_mut()
                        .ok_or_else(|| Error::validation("Reply record before any comment"))?;
                    comment.add_reply(decode_reply(line)?)?;
                }
                other => {
                    return Err(Error::validation(format!(
                        "Unexpected {other:?} record inside a post"
                    )))
                }
            }
        }
        if let Some(done) = pending {
            post.add_comment(done)?;
        }
        Ok(post)
    }
}

impl Record for Message {
    const KIND: &'static str = "message";

    fn encode(&self) -> String {
        join_fields(&[
            Self::KIND.to_string(),
            self.sender_id().to_string(),
            self.receiver_id().to_string(),
            self.timestamp().to_string(),
            flag(self.is_read()).to_string(),
            escape_field(self.content()),
        ])
    }

    fn decode(text: &str) -> Result<Self> {
        decode_message(&single_line(text, Self::KIND)?)
    }
}

fn decode_message(line: &str) -> Result<Message> {
    let f = fields_of(line, Message::KIND, 5)?;
    let mut message = Message::new(
        UserId(parse_int(&f[1], "sender ID")?),
        UserId(parse_int(&f[2], "receiver ID")?),
        f[5].clone(),
        parse_timestamp(&f[3])?,
    )?;
    if parse_flag(&f[4], "read flag")? {
        message.mark_as_read();
    }
    Ok(message)
}

impl Record for Conversation<Message> {
    const KIND: &'static str = "conversation";

    /// The conversation line followed by one line per message.
    fn encode(&self) -> String {
        let head = join_fields(&[
            Self::KIND.to_string(),
            self.id().to_string(),
            encode_ids(self.participants().iter().copied()),
        ]);
        let mut lines = vec![head];
        lines.extend(self.messages().iter().map(Record::encode));
        lines.join("\n")
    }

    /// Messages are restored as stored, including those whose sender has
    /// since left the conversation.
    fn decode(text: &str) -> Result<Self> {
        let mut lines = non_empty_lines(text);
        let head = lines
            .next()
            .ok_or_else(|| Error::validation("Empty conversation record"))?;
        let f = fields_of(head, Self::KIND, 2)?;
        let messages = lines.map(decode_message).collect::<Result<Vec<_>>>()?;
        Conversation::from_parts(
            ConversationId(parse_int(&f[1], "conversation ID")?),
            parse_ids(&f[2], "participant ID")?,
            messages,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_shared::{Blake3Hasher, ErrorKind};

    use crate::user::NewUser;

    fn ts(h: i32) -> Timestamp {
        Timestamp::with_time(12, 4, 2025, h, 30, 0)
    }

    #[test]
    fn test_escape_and_split() {
        let nasty = "a|b\\c\nd\re,f";
        let line = format!("x|{}|tail", escape_field(nasty));
        assert!(!line.contains('\n'));
        assert_eq!(split_record(&line).unwrap(), vec!["x", nasty, "tail"]);
        assert_eq!(split_record("").unwrap(), vec![""]);
    }

    #[test]
    fn test_split_rejects_bad_escapes() {
        assert!(split_record("a\\").is_err());
        let err = split_record("a\\q").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_user_record() {
        let mut user = User::new(
            UserId(3),
            NewUser::new("x.y@mail.com", "Pipe | Name", "pw", "F", Timestamp::new(29, 2, 2000)),
            &Blake3Hasher,
        )
        .unwrap();
        user.add_friend(UserId(4), true);
        user.add_friend(UserId(5), false);
        user.add_post(PostId(9));

        let text = user.encode();
        assert!(text.starts_with("user|3|x.y@mail.com|Pipe \\| Name|"));
        assert!(text.ends_with("|F|2000-02-29|4:1,5:0|9"));

        let back = User::decode(&text).unwrap();
        assert_eq!(back.name(), "Pipe | Name");
        assert_eq!(back.password_hash(), user.password_hash());
        assert!(back.is_restricted_friend(UserId(4)));
        assert!(back.is_friend(UserId(5)) && !back.is_restricted_friend(UserId(5)));
        assert_eq!(back.posts(), &[PostId(9)]);
        assert!(back.validate_password("pw", &Blake3Hasher));
    }

    #[test]
    fn test_user_record_revalidates() {
        let line = "user|3|not-an-email|Name|hash|F|2000-01-01||";
        let err = User::decode(line).unwrap_err();
        assert_eq!(err.message(), "Invalid email format");
        assert!(User::decode("user|3|a@b.com|N|h|F|2000-01-01|4:2|").is_err());
        assert!(User::decode("user|3|a@b.com|N|h|F|2000-01-01|3:0|").is_err());
        assert!(User::decode("user|3|a@b.com|N|h|F|2000-01-01||5,5").is_err());
        assert!(User::decode("user|3|a@b.com").is_err());
        assert!(User::decode("post|3|a@b.com|N|h|F|2000-01-01||").is_err());
    }

    #[test]
    fn test_post_thread_record() {
        let mut post = Post::new(PostId(1), UserId(1), "multi\nline", ts(8), Privacy::FriendsOnly).unwrap();
        post.tag_user(UserId(2)).unwrap();
        post.add_like(UserId(3)).unwrap();
        post.react(UserId(3), ReactionKind::Love).unwrap();

        let mut first = Comment::new(CommentId(1), UserId(2), "nice", ts(9)).unwrap();
        first.add_like(UserId(1)).unwrap();
        let mut reply = Reply::new(ReplyId(1), UserId(1), CommentId(1), "thanks", ts(10)).unwrap();
        reply.add_like(UserId(2)).unwrap();
        first.add_reply(reply).unwrap();
        post.add_comment(first).unwrap();
        post.add_comment(Comment::new(CommentId(2), UserId(3), "second", ts(11)).unwrap())
            .unwrap();

        let text = post.encode();
        assert_eq!(text.lines().count(), 4);

        let back = Post::decode(&text).unwrap();
        assert_eq!(back.content(), "multi\nline");
        assert_eq!(back.privacy(), Privacy::FriendsOnly);
        assert!(back.is_user_tagged(UserId(2)));
        assert!(back.is_liked_by(UserId(3)));
        assert_eq!(back.reaction_of(UserId(3)), Some(ReactionKind::Love));
        assert_eq!(back.comments().len(), 2);
        let c = back.comment(CommentId(1)).unwrap();
        assert!(c.is_liked_by(UserId(1)));
        assert_eq!(c.replies().len(), 1);
        assert!(c.replies()[0].is_liked_by(UserId(2)));
        assert_eq!(back.comment(CommentId(2)).unwrap().timestamp(), ts(11));
    }

    #[test]
    fn test_post_rejects_orphan_reply() {
        let text = "post|1|1|0|2025-01-01|hi|||\nreply|1|1|1|2025-01-01|orphan|";
        assert!(Post::decode(text).is_err());
        let text = "post|1|1|7|2025-01-01|hi|||";
        assert!(Post::decode(text).is_err());
    }

    #[test]
    fn test_comment_record_checks_reply_parent() {
        let comment = Comment::new(CommentId(4), UserId(1), "c", ts(1)).unwrap();
        let text = format!("{}\nreply|1|5|2|2025-04-12 01:30:00|wrong parent|", comment.encode());
        let err = Comment::decode(&text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_reply_record() {
        let reply = Reply::new(ReplyId(7), UserId(2), CommentId(3), "ok", ts(0)).unwrap();
        assert_eq!(reply.encode(), "reply|7|3|2|2025-04-12 00:30:00|ok|");
        let back = Reply::decode(&reply.encode()).unwrap();
        assert_eq!(back.comment_id(), CommentId(3));
        assert!(Reply::decode("reply|7|3|2|2025-04-12|").is_err());
    }

    #[test]
    fn test_conversation_record_keeps_read_state() {
        let mut conv = Conversation::new(ConversationId(2), vec![UserId(1), UserId(2)]).unwrap();
        conv.add_message(Message::new(UserId(1), UserId(2), "hi", ts(1)).unwrap())
            .unwrap();
        conv.add_message(Message::new(UserId(2), UserId(1), "yo", ts(2)).unwrap())
            .unwrap();
        conv.mark_read_for(UserId(2));
        conv.remove_participant(UserId(2));

        let back = Conversation::<Message>::decode(&conv.encode()).unwrap();
        assert_eq!(back.participants(), &[UserId(1)]);
        let read: Vec<bool> = back.messages().iter().map(|m| m.is_read()).collect();
        assert_eq!(read, vec![true, false]);
        assert_eq!(back.messages()[1].sender_id(), UserId(2));
    }

    #[test]
    fn test_message_record() {
        let msg = Message::new(UserId(1), UserId(2), "a\\b", ts(3)).unwrap();
        assert_eq!(msg.encode(), "message|1|2|2025-04-12 03:30:00|0|a\\\\b");
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
        assert!(Message::decode("message|1|2|2025-04-12|2|x").is_err());
    }
}
