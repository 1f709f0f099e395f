//! In-process load memory: how many instances of each function are
//! currently running on this node, and how many free execution slots
//! remain. Two separate mutexes because the request counter is touched
//! on every single request while the function table is only touched on
//! schedule/complete.

use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct FunctionLoad {
    name: String,
    running_instances: u32,
}

#[derive(Debug)]
struct Inner {
    functions: Vec<FunctionLoad>,
    total_running: u32,
}

/// Tracks running-instance counts per function and the global count used
/// to compute free slots. `running_functions_max` is fixed at
/// construction time; it is not rebuilt on a config reload (see
/// DESIGN.md).
pub struct LoadMemory {
    inner: Mutex<Inner>,
    request_number: Mutex<u64>,
    running_functions_max: u32,
}

impl LoadMemory {
    pub fn new(running_functions_max: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                functions: Vec::new(),
                total_running: 0,
            }),
            request_number: Mutex::new(0),
            running_functions_max,
        }
    }

    pub fn running_instances(&self, function_name: &str) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        get_or_create(&mut inner.functions, function_name).running_instances
    }

    pub fn mark_running(&self, function_name: &str) {
        let mut inner = self.inner.lock().unwrap();
        get_or_create(&mut inner.functions, function_name).running_instances += 1;
        inner.total_running += 1;
    }

    pub fn mark_stopped(&self, function_name: &str) {
        let mut inner = self.inner.lock().unwrap();
        get_or_create(&mut inner.functions, function_name).running_instances -= 1;
        inner.total_running -= 1;
    }

    pub fn total_running(&self) -> u32 {
        self.inner.lock().unwrap().total_running
    }

    /// Current load, as reported to peers probing this node.
    pub fn current_load(&self) -> u32 {
        self.total_running()
    }

    pub fn free_slots(&self) -> i64 {
        self.running_functions_max as i64 - self.total_running() as i64
    }

    /// Development-only, monotone, zero in production (callers decide
    /// whether to invoke this based on the running environment).
    pub fn next_request_number(&self) -> u64 {
        let mut n = self.request_number.lock().unwrap();
        *n += 1;
        *n
    }
}

fn get_or_create<'a>(functions: &'a mut Vec<FunctionLoad>, name: &str) -> &'a mut FunctionLoad {
    if let Some(idx) = functions.iter().position(|f| f.name == name) {
        return &mut functions[idx];
    }
    functions.push(FunctionLoad {
        name: name.to_string(),
        running_instances: 0,
    });
    functions.last_mut().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_running_and_stopped_are_net_zero() {
        let mem = LoadMemory::new(4);
        mem.mark_running("fn-a");
        mem.mark_running("fn-a");
        mem.mark_running("fn-b");
        assert_eq!(mem.total_running(), 3);
        assert_eq!(mem.running_instances("fn-a"), 2);

        mem.mark_stopped("fn-a");
        mem.mark_stopped("fn-b");
        assert_eq!(mem.total_running(), 1);
        assert_eq!(mem.running_instances("fn-a"), 1);
        assert_eq!(mem.running_instances("fn-b"), 0);
    }

    #[test]
    fn free_slots_tracks_running_max() {
        let mem = LoadMemory::new(2);
        assert_eq!(mem.free_slots(), 2);
        mem.mark_running("fn-a");
        assert_eq!(mem.free_slots(), 1);
        mem.mark_running("fn-b");
        assert_eq!(mem.free_slots(), 0);
        mem.mark_stopped("fn-a");
        assert_eq!(mem.free_slots(), 1);
    }

    #[test]
    fn request_numbers_are_monotone() {
        let mem = LoadMemory::new(1);
        assert_eq!(mem.next_request_number(), 1);
        assert_eq!(mem.next_request_number(), 2);
        assert_eq!(mem.next_request_number(), 3);
    }
}
