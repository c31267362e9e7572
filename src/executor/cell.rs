//! Type-erased storage for a single spawned call.
//!
//! A [`RawHandle`] owns one heap cell holding the function, its argument
//! bundle and a slot for its result. The handle itself carries no type
//! parameters: the queue and the workers move it around and run it through
//! a pair of function pointers that were monomorphized when the cell was
//! built. Only [`Task<R>`](super::Task) knows the concrete output type
//! again, and reads the slot back through [`RawHandle::take_output`].

use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::thread;

/// Result slot of a cell. Empty until the call has run; holds the panic
/// payload instead of a value if the call unwound.
pub(crate) type Slot<R> = Option<thread::Result<R>>;

/// A function that can be invoked with the argument bundle `Args`.
///
/// Implemented for every `FnOnce` of up to eight arguments, with the
/// arguments packed into a tuple, so `spawn(f, (a, b))` ends up calling
/// `f(a, b)`. The zero-argument form takes `()`.
pub trait Callable<Args>: Send + 'static {
    /// Value produced by the call.
    type Output: Send + 'static;

    /// Invoke the function, unpacking `args` into its parameters.
    fn call(self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($($ty:ident $arg:ident),*) => {
        impl<Func, Ret, $($ty,)*> Callable<($($ty,)*)> for Func
        where
            Func: FnOnce($($ty),*) -> Ret + Send + 'static,
            Ret: Send + 'static,
            $($ty: Send + 'static,)*
        {
            type Output = Ret;

            fn call(self, ($($arg,)*): ($($ty,)*)) -> Ret {
                self($($arg),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A a);
impl_callable!(A a, B b);
impl_callable!(A a, B b, C c);
impl_callable!(A a, B b, C c, D d);
impl_callable!(A a, B b, C c, D d, E e);
impl_callable!(A a, B b, C c, D d, E e, G g);
impl_callable!(A a, B b, C c, D d, E e, G g, H h);
impl_callable!(A a, B b, C c, D d, E e, G g, H h, I i);

struct Cell<F, Args, R> {
    func: Option<F>,
    params: Option<Args>,
    output: Slot<R>,
}

/// Opaque, owning view of a task cell.
pub(crate) struct RawHandle {
    cell: NonNull<()>,
    output: NonNull<()>,
    run: unsafe fn(NonNull<()>) -> bool,
    release: unsafe fn(NonNull<()>),
}

// SAFETY: the cell behind the handle only ever holds `F`, `Args` and
// `F::Output`, all of which are `Send` by the bounds on `RawHandle::new`,
// and the handle is its sole owner.
unsafe impl Send for RawHandle {}

impl RawHandle {
    pub(crate) fn new<F, Args>(func: F, params: Args) -> Self
    where
        F: Callable<Args>,
        Args: Send + 'static,
    {
        let cell: *mut Cell<F, Args, F::Output> = Box::into_raw(Box::new(Cell {
            func: Some(func),
            params: Some(params),
            output: None,
        }));

        // SAFETY: `cell` comes straight from `Box::into_raw`, so it is
        // non-null, aligned and points at an initialized `Cell`.
        let (cell, output) = unsafe {
            (
                NonNull::new_unchecked(cell),
                NonNull::new_unchecked(ptr::addr_of_mut!((*cell).output)),
            )
        };

        Self {
            cell: cell.cast(),
            output: output.cast(),
            run: run_cell::<F, Args>,
            release: release_cell::<F, Args>,
        }
    }

    /// Invoke the stored function and fill the output slot. Returns `false`
    /// if the function panicked.
    ///
    /// # Panics
    ///
    /// Panics if the handle has already been run.
    pub(crate) fn run(&mut self) -> bool {
        // SAFETY: `self.run` was instantiated for the exact cell type behind
        // `self.cell`, and `&mut self` gives exclusive access to it.
        unsafe { (self.run)(self.cell) }
    }

    /// Move the result out of the output slot.
    ///
    /// # Safety
    ///
    /// `R` must be the output type of the function this handle was built
    /// from. [`Task<R>`](super::Task) upholds this: its `R` is fixed by
    /// `Runtime::spawn` from the same `Callable::Output`.
    pub(crate) unsafe fn take_output<R>(&mut self) -> Slot<R> {
        // SAFETY: the caller guarantees `R` matches, so `output` points at a
        // live `Slot<R>` owned by this handle.
        unsafe { self.output.cast::<Slot<R>>().as_mut().take() }
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        // SAFETY: the handle owns the cell and drop runs once.
        unsafe { (self.release)(self.cell) }
    }
}

unsafe fn run_cell<F, Args>(cell: NonNull<()>) -> bool
where
    F: Callable<Args>,
{
    // SAFETY: `cell` was created by `RawHandle::new::<F, Args>`.
    let cell = unsafe { cell.cast::<Cell<F, Args, F::Output>>().as_mut() };
    let (func, params) = match (cell.func.take(), cell.params.take()) {
        (Some(func), Some(params)) => (func, params),
        _ => panic!("task cell ran more than once"),
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(move || func.call(params)));
    let completed = outcome.is_ok();
    cell.output = Some(outcome);
    completed
}

unsafe fn release_cell<F, Args>(cell: NonNull<()>)
where
    F: Callable<Args>,
{
    // SAFETY: `cell` was produced by `Box::into_raw` in `RawHandle::new`
    // with this exact type and has not been freed yet.
    drop(unsafe { Box::from_raw(cell.cast::<Cell<F, Args, F::Output>>().as_ptr()) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_run_then_take_output() {
        let mut handle = RawHandle::new(|| 42u32, ());
        assert!(handle.run());

        let slot = unsafe { handle.take_output::<u32>() };
        assert_eq!(slot.unwrap().unwrap(), 42);
    }

    #[test]
    fn test_arguments_are_unpacked() {
        let mut handle = RawHandle::new(
            |name: String, n: i32, suffix: &'static str| format!("{}-{}{}", name, n, suffix),
            ("job".to_string(), 7, "!"),
        );
        handle.run();

        let slot = unsafe { handle.take_output::<String>() };
        assert_eq!(slot.unwrap().unwrap(), "job-7!");
    }

    #[test]
    fn test_output_empty_before_run() {
        let mut handle = RawHandle::new(|x: u8| x, (1,));
        assert!(unsafe { handle.take_output::<u8>() }.is_none());
    }

    #[test]
    fn test_panic_is_captured() {
        let mut handle = RawHandle::new(|| -> u32 { panic!("boom") }, ());
        assert!(!handle.run());

        let slot = unsafe { handle.take_output::<u32>() };
        assert!(slot.unwrap().is_err());
    }

    #[test]
    fn test_release_without_run_drops_params() {
        let drops = Arc::new(AtomicUsize::new(0));
        let handle = RawHandle::new(|c: DropCounter| drop(c), (DropCounter(drops.clone()),));

        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_drops_untaken_output() {
        let drops = Arc::new(AtomicUsize::new(0));
        let counter = DropCounter(drops.clone());
        let mut handle = RawHandle::new(move || counter, ());

        handle.run();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
