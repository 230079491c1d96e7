use super::*;
use crate::errors::EvalErrorKind;
use pretty_assertions::assert_eq;

#[test]
fn test_define_and_get() {
    let env = Environment::new();
    env.define("x", Value::Int(42));
    assert_eq!(env.get("x"), Ok(Value::Int(42)));
}

#[test]
fn test_undefined_name() {
    let env = Environment::new();
    let err = env.get("missing").unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedVariable {
            name: "missing".to_string()
        }
    );
    assert!(!env.has("missing"));
}

#[test]
fn test_shadowing() {
    let global = Environment::new();
    global.define("x", Value::Int(1));

    let child = global.create_child();
    child.define("x", Value::Int(2));

    assert_eq!(child.get("x"), Ok(Value::Int(2)));
    assert_eq!(global.get("x"), Ok(Value::Int(1)));
}

#[test]
fn test_set_writes_through_to_defining_ancestor() {
    let global = Environment::new();
    global.define("counter", Value::Int(0));
    let child = global.create_child();
    let grandchild = child.create_child();

    grandchild.set("counter", Value::Int(5));

    assert_eq!(global.get("counter"), Ok(Value::Int(5)));
    assert!(!child.has_local("counter"));
    assert!(!grandchild.has_local("counter"));
}

#[test]
fn test_set_defines_locally_when_unbound() {
    let global = Environment::new();
    let child = global.create_child();

    child.set("fresh", Value::Int(1));

    assert!(child.has_local("fresh"));
    assert!(!global.has("fresh"));
}

#[test]
fn test_set_prefers_nearest_binding() {
    let global = Environment::new();
    global.define("x", Value::Int(1));
    let child = global.create_child();
    child.define("x", Value::Int(2));

    child.set("x", Value::Int(3));

    assert_eq!(child.get("x"), Ok(Value::Int(3)));
    assert_eq!(global.get("x"), Ok(Value::Int(1)));
}

#[test]
fn test_depth_and_parent() {
    let global = Environment::new();
    let child = global.create_child();
    assert!(global.is_root());
    assert_eq!(child.depth(), 1);
    assert!(child.parent().is_some_and(|p| p.ptr_eq(&global)));
}

#[test]
fn test_visible_bindings_inner_wins() {
    let global = Environment::new();
    global.define("a", Value::Int(1));
    global.define("b", Value::Int(1));
    let child = global.create_child();
    child.define("b", Value::Int(2));

    let visible = child.visible_bindings();
    assert_eq!(visible.get("a"), Some(&Value::Int(1)));
    assert_eq!(visible.get("b"), Some(&Value::Int(2)));
    assert_eq!(visible.len(), 2);
}

mod cache_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repeated_lookup_hits_cache() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let child = global.create_child();

        assert_eq!(child.get("x"), Ok(Value::Int(1)));
        assert_eq!(child.get("x"), Ok(Value::Int(1)));

        let stats = child.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_ancestor_write_invalidates_child_cache() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let child = global.create_child();
        assert_eq!(child.get("x"), Ok(Value::Int(1)));

        global.define("x", Value::Int(2));

        assert_eq!(child.get("x"), Ok(Value::Int(2)));
    }

    #[test]
    fn test_sibling_write_invalidates_cached_ancestor_value() {
        let global = Environment::new();
        global.define("shared", Value::Int(1));
        let left = global.create_child();
        let right = global.create_child();
        assert_eq!(right.get("shared"), Ok(Value::Int(1)));

        left.set("shared", Value::Int(7));

        assert_eq!(right.get("shared"), Ok(Value::Int(7)));
    }

    #[test]
    fn test_local_shadow_after_cached_lookup() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let child = global.create_child();
        assert_eq!(child.get("x"), Ok(Value::Int(1)));

        child.define("x", Value::Int(9));

        assert_eq!(child.get("x"), Ok(Value::Int(9)));
    }

    #[test]
    fn test_create_child_clears_spawning_frame_cache() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        assert_eq!(global.get("x"), Ok(Value::Int(1)));
        assert_eq!(global.cache_stats().entries, 1);

        let _child = global.create_child();

        assert_eq!(global.cache_stats().entries, 0);
    }

    #[test]
    fn test_clear_cache_resets_counters() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let child = global.create_child();
        assert_eq!(child.get("x"), Ok(Value::Int(1)));
        assert_eq!(child.get("x"), Ok(Value::Int(1)));

        child.clear_cache();

        assert_eq!(
            child.cache_stats(),
            CacheStats {
                hits: 0,
                misses: 0,
                entries: 0,
            }
        );
    }

    #[test]
    fn test_create_child_keeps_parent_counters() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        assert_eq!(global.get("x"), Ok(Value::Int(1)));

        let _child = global.create_child();

        assert_eq!(global.cache_stats().misses, 1);
    }
}

mod concurrency_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frames_are_shareable_across_threads() {
        let global = Environment::new();
        global.define("base", Value::Int(10));

        std::thread::scope(|s| {
            for i in 0..4 {
                let frame = global.create_child();
                s.spawn(move || {
                    frame.define("i", Value::Int(i));
                    assert_eq!(frame.get("base"), Ok(Value::Int(10)));
                    assert_eq!(frame.get("i"), Ok(Value::Int(i)));
                });
            }
        });

        assert!(!global.has("i"));
    }
}
