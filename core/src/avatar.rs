//! Discord CDN urls for user avatars.

pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// The avatar a Discord client would show for this user.
///
/// Custom avatars keep their animation (`a_` hashes are served as gif) and are
/// requested at `size`. Users without one get the default avatar Discord assigns,
/// so the result is never empty.
pub fn display_avatar_url(user_id: &str, avatar: Option<&str>, discriminator: &str, size: u16) -> String {
    match avatar {
        Some(hash) if !hash.is_empty() => {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };
            format!("{CDN_BASE}/avatars/{user_id}/{hash}.{ext}?size={size}")
        }
        _ => format!(
            "{CDN_BASE}/embed/avatars/{}.png",
            default_avatar_index(user_id, discriminator)
        ),
    }
}

/// Migrated accounts (discriminator `0`) derive it from the snowflake timestamp,
/// legacy ones from their tag.
pub fn default_avatar_index(user_id: &str, discriminator: &str) -> u64 {
    match discriminator.parse::<u64>() {
        Ok(tag) if tag != 0 => tag % 5,
        _ => user_id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0),
    }
}
