use uuid::Uuid;

/// Build a collision-resistant identifier for the given kind (`ctx`, `dep`, `gen`, ...).
pub fn new_id(kind: &str) -> String {
    format!("{kind}_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_carry_kind_prefix() {
        let id = new_id("ctx");
        assert!(id.starts_with("ctx_"));
        assert_eq!(id.len(), "ctx_".len() + 32);
    }

    #[test]
    fn ids_do_not_collide() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id("dep")).collect();
        assert_eq!(ids.len(), 1000);
    }
}
