//! Shared resource definitions for the `resgraph` integration tests.

#![allow(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::ptr_arg)]

use std::{
    cell::RefCell,
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use resgraph::{
    Config, Error, Resource, ResourceDeps, ResourceKind, Resources,
    StableHash,
};

// ============================================================================
// Text Resources
// ============================================================================

/// A resource without arguments.
pub struct A;

impl Resource for A {
    type Args = ();
    type Value = String;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        _: &(),
    ) -> Result<String, Error> {
        Ok("A".to_owned())
    }
}

/// `B{x}`
pub struct B;

impl Resource for B {
    type Args = i32;
    type Value = String;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        &x: &i32,
    ) -> Result<String, Error> {
        Ok(format!("B{x}"))
    }
}

/// A recursive resource: `C{x}(B{x},C{x-1})`, bottoming out at `_`.
pub struct C;

impl Resource for C {
    type Args = i32;
    type Value = String;

    fn compute<Cfg: Config>(
        deps: &mut ResourceDeps<'_, Cfg>,
        &x: &i32,
    ) -> Result<String, Error> {
        if x <= 0 {
            return Ok("_".to_owned());
        }

        let b = deps.get::<B>(&x)?;
        let previous = deps.get::<C>(&(x - 1))?;

        Ok(format!("C{x}({b},{previous})"))
    }
}

/// A resource with several heterogeneous arguments.
pub struct D;

impl Resource for D {
    type Args = (String, i32);
    type Value = String;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        (s, t): &(String, i32),
    ) -> Result<String, Error> {
        Ok(format!("D{s}{t}"))
    }
}

pub struct E;

impl Resource for E {
    type Args = (i32, i32);
    type Value = String;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        &(x, y): &(i32, i32),
    ) -> Result<String, Error> {
        Ok(format!("E{x}{y}"))
    }
}

pub struct F;

impl Resource for F {
    type Args = String;
    type Value = String;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        s: &String,
    ) -> Result<String, Error> {
        Ok(format!("F{s}"))
    }
}

/// A plain function usable as an override of [`F`].
pub fn not_f(_: &mut ResourceDeps<'_>, s: &String) -> Result<String, Error> {
    Ok(format!("not_F{s}"))
}

/// A seed resource; it has no definition of its own.
pub struct G;

impl Resource for G {
    type Args = ();
    type Value = String;

    const KIND: ResourceKind = ResourceKind::Seed;
}

thread_local! {
    static H_VERSIONS: RefCell<HashMap<i32, u32>> =
        RefCell::new(HashMap::new());
}

/// Like [`C`], but every evaluation of `H{key}` carries a per-key counter,
/// so a recomputation is visible in the value: `H{key}.{n}(B{key},...)`.
///
/// The counters are thread-local.
pub struct H;

impl Resource for H {
    type Args = i32;
    type Value = String;

    fn compute<C: Config>(
        deps: &mut ResourceDeps<'_, C>,
        &key: &i32,
    ) -> Result<String, Error> {
        let version = H_VERSIONS.with_borrow_mut(|versions| {
            let version = versions.entry(key).or_default();
            *version += 1;
            *version - 1
        });

        let b = deps.get::<B>(&key)?;
        let previous =
            if key > 0 { deps.get::<H>(&(key - 1))? } else { "_".to_owned() };

        Ok(format!("H{key}.{version}({b},{previous})"))
    }
}

// ============================================================================
// Camera and View
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraState {
    pub zoom: u32,
}

/// A shared, mutable camera bound as a seed.
pub struct Camera;

impl Camera {
    pub fn handle(zoom: u32) -> Arc<parking_lot::Mutex<CameraState>> {
        Arc::new(parking_lot::Mutex::new(CameraState { zoom }))
    }
}

impl Resource for Camera {
    type Args = ();
    type Value = Arc<parking_lot::Mutex<CameraState>>;

    const KIND: ResourceKind = ResourceKind::Seed;
}

/// Renders a named view through the [`Camera`]: `{name}@{zoom}`.
pub struct View;

impl Resource for View {
    type Args = String;
    type Value = String;

    fn compute<C: Config>(
        deps: &mut ResourceDeps<'_, C>,
        name: &String,
    ) -> Result<String, Error> {
        let camera = deps.get::<Camera>(&())?;
        let zoom = camera.lock().zoom;

        Ok(format!("{name}@{zoom}"))
    }
}

// ============================================================================
// Numeric Resources
// ============================================================================

/// `n * n`
pub struct Square;

impl Resource for Square {
    type Args = u64;
    type Value = u64;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        &n: &u64,
    ) -> Result<u64, Error> {
        Ok(n * n)
    }
}

/// The sum of the squares of every listed number.
#[derive(Debug, Clone, PartialEq, Eq, StableHash)]
pub struct SquareSum {
    pub numbers: Vec<u64>,
}

impl Resource for SquareSum {
    type Args = Self;
    type Value = u64;

    fn compute<C: Config>(
        deps: &mut ResourceDeps<'_, C>,
        args: &Self,
    ) -> Result<u64, Error> {
        args.numbers.iter().map(|n| deps.get::<Square>(n)).sum()
    }
}

/// Fails for negative inputs, otherwise doubles.
pub struct Checked;

impl Resource for Checked {
    type Args = i64;
    type Value = i64;

    fn compute<C: Config>(
        _: &mut ResourceDeps<'_, C>,
        &n: &i64,
    ) -> Result<i64, Error> {
        if n < 0 {
            return Err(Error::msg(format!("negative input {n}")));
        }

        Ok(n * 2)
    }
}

// ============================================================================
// Call Counting
// ============================================================================

/// Counts invocations of an override.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) { self.0.fetch_add(1, Ordering::SeqCst); }

    pub fn get(&self) -> usize { self.0.load(Ordering::SeqCst) }
}

/// An engine whose [`Square`] bumps `counter` and sleeps for `delay` before
/// returning.
pub fn counted_squares(counter: &Counter, delay: Duration) -> Resources {
    let counter = counter.clone();

    Resources::builder()
        .with_override::<Square, _>(move |_, &n| {
            counter.bump();
            std::thread::sleep(delay);

            Ok(n * n)
        })
        .build()
}
