use std::collections::HashMap;
use std::sync::Arc;

use super::processor::DataProcessor;
use crate::container::SignalSourceContainer;

struct ProcessorEntry {
    processor: Arc<dyn DataProcessor>,
    tag: Option<String>,
}

/// Container-keyed ordered sequences of processors, with tag and type
/// filters. Containers are keyed by raw pointer identity (`key_of`)
/// rather than a wrapper type, since `Arc<dyn SignalSourceContainer>`
/// has no natural `Eq`/`Hash` of its own.
#[derive(Default)]
pub struct DataProcessingChain {
    entries: HashMap<usize, (Arc<dyn SignalSourceContainer>, Vec<ProcessorEntry>)>,
}

impl DataProcessingChain {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    fn key_of(container: &Arc<dyn SignalSourceContainer>) -> usize {
        Arc::as_ptr(container) as *const () as usize
    }

    pub fn add(&mut self, processor: Arc<dyn DataProcessor>, container: Arc<dyn SignalSourceContainer>, tag: Option<String>) {
        processor.on_attach(container.clone());
        let key = Self::key_of(&container);
        self.entries
            .entry(key)
            .or_insert_with(|| (container, Vec::new()))
            .1
            .push(ProcessorEntry { processor, tag });
    }

    pub fn add_at(&mut self, processor: Arc<dyn DataProcessor>, container: Arc<dyn SignalSourceContainer>, position: usize, tag: Option<String>) {
        processor.on_attach(container.clone());
        let key = Self::key_of(&container);
        let list = &mut self.entries.entry(key).or_insert_with(|| (container, Vec::new())).1;
        let position = position.min(list.len());
        list.insert(position, ProcessorEntry { processor, tag });
    }

    pub fn remove(&mut self, processor: &Arc<dyn DataProcessor>, container: &Arc<dyn SignalSourceContainer>) {
        let key = Self::key_of(container);
        let Some((_, list)) = self.entries.get_mut(&key) else { return };
        list.retain(|entry| !Arc::ptr_eq(&entry.processor, processor));
        processor.on_detach(container.clone());
        if list.is_empty() {
            self.entries.remove(&key);
        }
    }

    pub fn process(&self, container: &Arc<dyn SignalSourceContainer>) {
        let key = Self::key_of(container);
        if let Some((_, list)) = self.entries.get(&key) {
            for entry in list {
                entry.processor.process(container.clone());
            }
        }
    }

    pub fn process_filtered(
        &self,
        container: &Arc<dyn SignalSourceContainer>,
        filter: impl Fn(&Arc<dyn DataProcessor>) -> bool,
    ) {
        let key = Self::key_of(container);
        if let Some((_, list)) = self.entries.get(&key) {
            for entry in list {
                if filter(&entry.processor) {
                    entry.processor.process(container.clone());
                }
            }
        }
    }

    pub fn process_tagged(&self, container: &Arc<dyn SignalSourceContainer>, tag: &str) {
        let key = Self::key_of(container);
        if let Some((_, list)) = self.entries.get(&key) {
            for entry in list {
                if entry.tag.as_deref() == Some(tag) {
                    entry.processor.process(container.clone());
                }
            }
        }
    }

    pub fn process_typed<T: DataProcessor + 'static>(&self, container: &Arc<dyn SignalSourceContainer>) {
        let key = Self::key_of(container);
        if let Some((_, list)) = self.entries.get(&key) {
            for entry in list {
                if entry.processor.as_any().downcast_ref::<T>().is_some() {
                    entry.processor.process(container.clone());
                }
            }
        }
    }

    pub fn processor_count(&self, container: &Arc<dyn SignalSourceContainer>) -> usize {
        let key = Self::key_of(container);
        self.entries.get(&key).map(|(_, list)| list.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::audio::AudioStreamContainer;
    use crate::structure::Organization;
    use crate::variant::DataVariant;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProcessor {
        attaches: AtomicUsize,
        detaches: AtomicUsize,
        processes: AtomicUsize,
    }

    impl CountingProcessor {
        fn new() -> Self {
            Self { attaches: AtomicUsize::new(0), detaches: AtomicUsize::new(0), processes: AtomicUsize::new(0) }
        }
    }

    impl DataProcessor for CountingProcessor {
        fn on_attach(&self, _container: Arc<dyn SignalSourceContainer>) {
            self.attaches.fetch_add(1, Ordering::SeqCst);
        }
        fn on_detach(&self, _container: Arc<dyn SignalSourceContainer>) {
            self.detaches.fetch_add(1, Ordering::SeqCst);
        }
        fn process(&self, _container: Arc<dyn SignalSourceContainer>) {
            self.processes.fetch_add(1, Ordering::SeqCst);
        }
        fn is_processing(&self) -> bool {
            false
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn container() -> Arc<dyn SignalSourceContainer> {
        let data = vec![DataVariant::F64(vec![0.0; 10])];
        Arc::new(AudioStreamContainer::new(Organization::Interleaved, 10, 1, data, 48_000.0).unwrap())
    }

    #[test]
    fn attach_runs_in_registered_order() {
        let mut chain = DataProcessingChain::new();
        let container = container();
        let p1: Arc<dyn DataProcessor> = Arc::new(CountingProcessor::new());
        let p2: Arc<dyn DataProcessor> = Arc::new(CountingProcessor::new());
        chain.add(p1.clone(), container.clone(), None);
        chain.add(p2.clone(), container.clone(), None);
        assert_eq!(chain.processor_count(&container), 2);
        chain.process(&container);
        let p1c = p1.as_any().downcast_ref::<CountingProcessor>().unwrap();
        assert_eq!(p1c.processes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_empties_mapping() {
        let mut chain = DataProcessingChain::new();
        let container = container();
        let p1: Arc<dyn DataProcessor> = Arc::new(CountingProcessor::new());
        chain.add(p1.clone(), container.clone(), None);
        chain.remove(&p1, &container);
        assert_eq!(chain.processor_count(&container), 0);
    }

    #[test]
    fn tagged_processing_filters() {
        let mut chain = DataProcessingChain::new();
        let container = container();
        let p1: Arc<dyn DataProcessor> = Arc::new(CountingProcessor::new());
        let p2: Arc<dyn DataProcessor> = Arc::new(CountingProcessor::new());
        chain.add(p1.clone(), container.clone(), Some("a".into()));
        chain.add(p2.clone(), container.clone(), Some("b".into()));
        chain.process_tagged(&container, "a");
        let p1c = p1.as_any().downcast_ref::<CountingProcessor>().unwrap();
        let p2c = p2.as_any().downcast_ref::<CountingProcessor>().unwrap();
        assert_eq!(p1c.processes.load(Ordering::SeqCst), 1);
        assert_eq!(p2c.processes.load(Ordering::SeqCst), 0);
    }
}
