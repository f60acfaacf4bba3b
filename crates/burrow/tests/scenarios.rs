//! End-to-end scenarios exercising the public API the way a caller would.

use std::cell::RefCell;

use burrow::{context, defer, defer_with, Arena, ArenaConfig, ArenaError, Context, DynArray};

#[test]
fn small_arena_bump_and_exhaust() {
    let mut arena = Arena::new(ArenaConfig::new(64).with_alignment(8)).unwrap();

    let a = arena.alloc(3).unwrap();
    assert_eq!(a.offset(), 0);
    assert_eq!(arena.used(), 3);

    let b = arena.alloc(10).unwrap();
    assert_eq!(b.offset(), 8);
    assert_eq!(arena.used(), 18);

    let err = arena.alloc(50).unwrap_err();
    assert!(matches!(err, ArenaError::OutOfMemory { .. }));
    assert_eq!(arena.used(), 18);

    // Addresses line up with offsets from the base.
    let base = arena.base_ptr() as usize;
    assert_eq!(base % 8, 0);
    assert_eq!(arena.bytes(&b).unwrap().as_ptr() as usize, base + 8);
}

#[test]
fn array_push_sequence() {
    let mut ctx = Context::new(ArenaConfig::new(4096)).unwrap();
    let mut values = ctx.array::<i32>().unwrap();
    for v in [2, 4, 3, 5, 4] {
        values.push(ctx.arena_mut(), v).unwrap();
    }

    assert_eq!(values.len(), 5);
    assert_eq!(values.capacity(), 8);
    let read: Vec<i32> = (0..5).map(|i| values.get(ctx.arena(), i).unwrap()).collect();
    assert_eq!(read, vec![2, 4, 3, 5, 4]);
    assert_eq!(
        values.get(ctx.arena(), 5),
        Err(ArenaError::OutOfBounds { index: 5, len: 5 })
    );
}

#[test]
fn two_arrays_sharing_an_arena_stay_correct() {
    let mut arena = Arena::with_capacity(1 << 16).unwrap();
    let mut evens = DynArray::<u64>::new(&mut arena).unwrap();
    let mut odds = DynArray::<u64>::new(&mut arena).unwrap();
    for i in 0..200u64 {
        if i % 2 == 0 {
            evens.push(&mut arena, i).unwrap();
        } else {
            odds.push(&mut arena, i).unwrap();
        }
    }
    assert!(evens.iter(&arena).unwrap().all(|v| v % 2 == 0));
    assert!(odds.iter(&arena).unwrap().all(|v| v % 2 == 1));
    assert_eq!(evens.len(), 100);
    assert_eq!(odds.len(), 100);
    assert!(arena.stats().relocating_grows > 0);
}

#[test]
fn array_from_closed_scope_cannot_write_into_newer_data() {
    let mut arena = Arena::with_capacity(4096).unwrap();
    let mut leaked = {
        let mut scope = arena.scope();
        let array = DynArray::<u32>::new(&mut scope).unwrap();
        array
    };
    let live = arena.alloc_bytes(&[1, 1, 1, 1]).unwrap();
    assert_eq!(live.offset(), leaked.allocation().offset());

    assert!(matches!(
        leaked.push(&mut arena, 7),
        Err(ArenaError::RolledBack { .. })
    ));
    assert!(leaked.to_vec(&arena).is_err());
    assert_eq!(arena.bytes(&live).unwrap(), &[1, 1, 1, 1]);
}

#[test]
fn per_request_scratch_with_scope() {
    let mut arena = Arena::with_capacity(1 << 16).unwrap();
    let mut totals = DynArray::<u32>::new(&mut arena).unwrap();

    for request in 0..10u32 {
        let before = arena.used();
        let total = {
            let mut scope = arena.scope();
            let mut scratch = DynArray::<u32>::new(&mut scope).unwrap();
            for i in 0..=request {
                scratch.push(&mut scope, i).unwrap();
            }
            let total = scratch.iter(&scope).unwrap().sum::<u32>();
            total
        };
        assert_eq!(arena.used(), before);
        totals.push(&mut arena, total).unwrap();
    }

    assert_eq!(
        totals.to_vec(&arena).unwrap(),
        (0..10u32).map(|n| n * (n + 1) / 2).collect::<Vec<_>>()
    );
}

#[test]
fn deferred_restore_of_arena_cursor() {
    let mut arena = Arena::with_capacity(4096).unwrap();
    arena.alloc(32).unwrap();
    let events = RefCell::new(Vec::new());
    {
        defer! { events.borrow_mut().push("shutdown"); }
        let start = arena.checkpoint();
        let mut arena = defer_with(&mut arena, |arena| {
            arena.restore(start).unwrap();
            events.borrow_mut().push("restore");
        });
        arena.alloc(1024).unwrap();
        assert_eq!(arena.used(), 1056);
    }
    assert_eq!(arena.used(), 32);
    assert_eq!(*events.borrow(), ["restore", "shutdown"]);
}

#[test]
fn reset_starts_a_new_wave() {
    let mut arena = Arena::with_capacity(4096).unwrap();
    let first = arena.alloc_bytes(b"wave one").unwrap();
    arena.reset();
    arena.reset();
    let second = arena.alloc_bytes(b"wave two").unwrap();
    assert_eq!(second.offset(), first.offset());
    assert_eq!(arena.bytes(&second).unwrap(), b"wave two");
    assert!(arena.bytes(&first).is_err());
}

#[test]
fn thread_default_arena() {
    assert!(context::init(ArenaConfig::new(4096)).unwrap());
    let mut values = context::with_arena(DynArray::<u8>::new).unwrap().unwrap();
    for v in 1..=5u8 {
        context::with_arena(|arena| values.push(arena, v)).unwrap().unwrap();
    }
    let sum: u32 = context::with_arena(|arena| {
        values.iter(arena).map(|it| it.map(u32::from).sum::<u32>())
    })
    .unwrap()
    .unwrap();
    assert_eq!(sum, 15);
    assert!(context::release().unwrap().is_some());
}
