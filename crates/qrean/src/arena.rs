//! The engine's memory arena.
//!
//! Linear memory above `__heap_base` belongs to the engine allocator. The
//! host never manages that region itself; it asks the engine to (re)format
//! it with `tinymm_init` and to hand out blocks with `malloc` / `free`.
//! Memory may grow and move inside any of those calls, so views are always
//! taken fresh from the store afterwards.

use log::debug;
use qrean_core::{MemoryView, MemoryViewMut, Offset, ScratchBuffer};
use wasmtime::{Func, Instance, Memory, Store, TypedFunc, Val, ValType};

use crate::config::WASM_PAGE_SIZE;
use crate::host::HostState;
use crate::{QreanError, Result};

pub(crate) struct Arena {
    memory: Memory,
    heap_base: Offset<ScratchBuffer>,
    blocks: u32,
    /// `tinymm_init(base, size, blocks)`; its result, if any, is ignored.
    init: Func,
    malloc: TypedFunc<u32, u32>,
    free: TypedFunc<u32, ()>,
}

impl Arena {
    /// Look up the memory and allocator exports of a fresh instance.
    pub(crate) fn bind(
        store: &mut Store<HostState>,
        instance: &Instance,
        blocks: u32,
    ) -> Result<Self> {
        let memory = instance
            .get_memory(&mut *store, "memory")
            .ok_or_else(|| QreanError::init_failed("engine does not export `memory`"))?;
        let heap_base = instance
            .get_global(&mut *store, "__heap_base")
            .and_then(|g| g.get(&mut *store).i32())
            .ok_or_else(|| QreanError::init_failed("engine does not export an i32 `__heap_base`"))?
            as u32;
        if heap_base as usize > memory.data_size(&*store) {
            return Err(QreanError::init_failed(format!(
                "__heap_base {heap_base:#x} lies beyond initial memory"
            )));
        }

        let init = instance
            .get_func(&mut *store, "tinymm_init")
            .ok_or_else(|| QreanError::init_failed("engine does not export `tinymm_init`"))?;
        let init_ty = init.ty(&*store);
        if init_ty.params().len() != 3 || !init_ty.params().all(|p| matches!(p, ValType::I32)) {
            return Err(QreanError::init_failed(format!(
                "unexpected `tinymm_init` signature {init_ty:?}"
            )));
        }

        let malloc = instance
            .get_typed_func::<u32, u32>(&mut *store, "malloc")
            .map_err(QreanError::init_failed)?;
        let free = instance
            .get_typed_func::<u32, ()>(&mut *store, "free")
            .map_err(QreanError::init_failed)?;

        Ok(Self {
            memory,
            heap_base: Offset::new(heap_base),
            blocks,
            init,
            malloc,
            free,
        })
    }

    pub(crate) fn heap_base(&self) -> u32 {
        self.heap_base.raw()
    }

    /// Current linear memory size in bytes.
    pub(crate) fn len(&self, store: &Store<HostState>) -> usize {
        self.memory.data_size(store)
    }

    /// Bytes between `__heap_base` and the end of linear memory.
    pub(crate) fn capacity(&self, store: &Store<HostState>) -> usize {
        self.len(store).saturating_sub(self.heap_base.raw() as usize)
    }

    /// Grow linear memory by `pages`, returning the new size in bytes.
    pub(crate) fn grow(&self, store: &mut Store<HostState>, pages: u32) -> Result<usize> {
        self.memory
            .grow(&mut *store, u64::from(pages))
            .map_err(|_| QreanError::OutOfMemory {
                requested: u64::from(pages) * WASM_PAGE_SIZE,
            })?;
        Ok(self.len(store))
    }

    /// Zero everything above `__heap_base` and re-format it for the engine
    /// allocator. Every outstanding block is invalid afterwards.
    pub(crate) fn reset(&self, store: &mut Store<HostState>) -> Result<()> {
        self.view_mut(store).zero_tail(self.heap_base)?;
        let len = self.len(store);
        let size = u32::try_from(len - self.heap_base.raw() as usize).unwrap_or(u32::MAX);

        let params = [
            Val::I32(self.heap_base.raw() as i32),
            Val::I32(size as i32),
            Val::I32(self.blocks as i32),
        ];
        let mut results = vec![Val::I32(0); self.init.ty(&*store).results().len()];
        self.init
            .call(&mut *store, &params, &mut results)
            .map_err(|e| QreanError::engine_call("tinymm_init", e))?;
        debug!(
            "arena reset: heap_base={:#x} size={} blocks={}",
            self.heap_base.raw(),
            size,
            self.blocks
        );
        Ok(())
    }

    /// Allocate `len` bytes through the engine allocator.
    pub(crate) fn alloc<T>(&self, store: &mut Store<HostState>, len: usize) -> Result<Offset<T>> {
        let out_of_memory = QreanError::OutOfMemory {
            requested: len as u64,
        };
        let size = u32::try_from(len).map_err(|_| out_of_memory)?;
        let ptr = self
            .malloc
            .call(&mut *store, size)
            .map_err(|e| QreanError::engine_call("malloc", e))?;
        if ptr == 0 {
            return Err(QreanError::OutOfMemory {
                requested: len as u64,
            });
        }
        Ok(Offset::new(ptr))
    }

    pub(crate) fn free<T>(&self, store: &mut Store<HostState>, at: Offset<T>) -> Result<()> {
        if at.is_null() {
            return Ok(());
        }
        self.free
            .call(&mut *store, at.raw())
            .map_err(|e| QreanError::engine_call("free", e))
    }

    pub(crate) fn view<'a>(&self, store: &'a Store<HostState>) -> MemoryView<'a> {
        MemoryView::new(self.memory.data(store))
    }

    pub(crate) fn view_mut<'a>(&self, store: &'a mut Store<HostState>) -> MemoryViewMut<'a> {
        MemoryViewMut::new(self.memory.data_mut(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::build_linker;
    use wasmtime::Engine;

    // Bump allocator whose bookkeeping lives in globals, so a formatted
    // arena is all zero bytes.
    const BUMP_ENGINE: &str = r#"
        (module
          (memory (export "memory") 1)
          (global (export "__heap_base") i32 (i32.const 1024))
          (global $next (mut i32) (i32.const 0))
          (func (export "tinymm_init") (param $base i32) (param $size i32) (param $blocks i32)
            (global.set $next (local.get $base)))
          (func (export "malloc") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $next))
            (global.set $next (i32.add (local.get $ptr) (local.get $size)))
            (local.get $ptr))
          (func (export "free") (param i32)))
    "#;

    fn bound_arena() -> (Store<HostState>, Arena) {
        let engine = Engine::default();
        let module = wasmtime::Module::new(&engine, wat::parse_str(BUMP_ENGINE).unwrap()).unwrap();
        let linker = build_linker(&engine).unwrap();
        let mut store = Store::new(&engine, HostState::new(16 * WASM_PAGE_SIZE, 64));
        store.limiter(|state| &mut state.limits);
        let instance = linker.instantiate(&mut store, &module).unwrap();
        let arena = Arena::bind(&mut store, &instance, 8).unwrap();
        (store, arena)
    }

    fn heap_snapshot(arena: &Arena, store: &Store<HostState>) -> Vec<u8> {
        arena.memory.data(store)[arena.heap_base() as usize..].to_vec()
    }

    #[test]
    fn reset_twice_leaves_identical_zeroed_heap() {
        let (mut store, arena) = bound_arena();
        let block = arena.alloc::<ScratchBuffer>(&mut store, 256).unwrap();
        arena
            .view_mut(&mut store)
            .write_bytes(block, &[0xAB; 256])
            .unwrap();
        arena
            .view_mut(&mut store)
            .write_bytes(Offset::<ScratchBuffer>::new(60_000), b"stale")
            .unwrap();

        arena.reset(&mut store).unwrap();
        let first = heap_snapshot(&arena, &store);
        arena.reset(&mut store).unwrap();
        let second = heap_snapshot(&arena, &store);

        assert_eq!(first, second);
        assert!(first.iter().all(|&b| b == 0));
        assert_eq!(first.len(), arena.capacity(&store));
        // allocator starts over at the heap base
        let again = arena.alloc::<ScratchBuffer>(&mut store, 16).unwrap();
        assert_eq!(again.raw(), arena.heap_base());
    }

    #[test]
    fn grow_reports_new_length() {
        let (mut store, arena) = bound_arena();
        assert_eq!(arena.len(&store), WASM_PAGE_SIZE as usize);
        let len = arena.grow(&mut store, 3).unwrap();
        assert_eq!(len, 4 * WASM_PAGE_SIZE as usize);
        assert_eq!(len, arena.len(&store));
        assert_eq!(arena.capacity(&store), len - 1024);
    }

    #[test]
    fn grow_past_store_limit_is_out_of_memory() {
        let (mut store, arena) = bound_arena();
        let err = arena.grow(&mut store, 64).unwrap_err();
        assert!(matches!(
            err,
            QreanError::OutOfMemory { requested } if requested == 64 * WASM_PAGE_SIZE
        ));
        assert_eq!(arena.len(&store), WASM_PAGE_SIZE as usize);
    }
}
