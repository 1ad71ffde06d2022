use agora_core::{PostId, UserId};

pub const POST_KEY_PREFIX: &str = "post";
pub const FEED_KEY_PREFIX: &str = "feed:user";

/// Key of a cached post payload.
pub fn post_key(post_id: PostId) -> String {
    format!("{}:{}", POST_KEY_PREFIX, post_id)
}

/// Key of a user's ordered feed set.
pub fn feed_key(user_id: UserId) -> String {
    format!("{}:{}", FEED_KEY_PREFIX, user_id)
}

/// Feed-set member for a post. Zero-padded so that members with equal scores order the same way
/// as ids do.
pub fn feed_member(post_id: PostId) -> String {
    format!("{:020}", post_id)
}

pub fn parse_feed_member(member: &str) -> Option<PostId> {
    member.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(post_key(42), "post:42");
        assert_eq!(feed_key(7), "feed:user:7");
    }

    #[test]
    fn test_feed_members_sort_like_ids() {
        assert_eq!(feed_member(42), "00000000000000000042");
        assert!(feed_member(9) < feed_member(10));
        assert!(feed_member(99_999) < feed_member(100_000));
        assert_eq!(parse_feed_member(&feed_member(1234)), Some(1234));
        assert_eq!(parse_feed_member("1234"), Some(1234));
        assert_eq!(parse_feed_member("post"), None);
    }
}
