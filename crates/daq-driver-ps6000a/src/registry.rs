//! Buffer registry.
//!
//! The registry maps each [`BufferClass`] to the buffers currently registered
//! with the device for that class. Holding a [`Buffer`] clone here is what
//! keeps its storage alive (and its address valid for the device) across
//! acquisitions, until the class is cleared or the unit is closed.
//!
//! Rules enforced before anything reaches the device:
//! - a MIN buffer is only accepted together with a MAX buffer of identical
//!   class, downsampling mode and length;
//! - queries never create entries;
//! - a class holds each buffer at most once, so registering a buffer again
//!   keeps its original position.
//!
//! Pairing groups a class by downsampling mode into `(MAX, MIN?)` tuples.
//! A MIN buffer without a matching MAX is reported as an orphan rather than
//! dropped.

use std::collections::HashMap;
use std::ptr;

use tracing::{debug, info, warn};

use crate::boundary::DeviceBoundary;
use crate::buffer::{Buffer, BufferClass};
use crate::error::{Ps6000aError, Result};
use crate::session::Ps6000a;
use crate::types::{Action, BufferRole, Channel, DataType, RatioMode};

/// One `(MAX, MIN?)` pair within a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPair {
    /// Downsampling mode shared by both buffers
    pub mode: RatioMode,
    /// Primary buffer
    pub max: Buffer,
    /// Aggregate-minimum buffer, if registered
    pub min: Option<Buffer>,
}

/// Result of pairing a class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSet {
    /// Matched pairs, in registration order of their MAX buffer
    pub pairs: Vec<BufferPair>,
    /// MIN buffers with no matching MAX buffer
    pub orphans: Vec<Buffer>,
}

/// Class → registered buffers.
#[derive(Debug, Default)]
pub struct BufferRegistry {
    classes: HashMap<BufferClass, Vec<Buffer>>,
}

impl BufferRegistry {
    /// Check that `max` and `min` may be registered together.
    pub fn validate_pair(max: &Buffer, min: Option<&Buffer>) -> Result<()> {
        if max.role() != BufferRole::Max {
            return Err(Ps6000aError::validation(format!(
                "buffer {} has role {:?}, expected Max",
                max.id(),
                max.role()
            )));
        }
        let Some(min) = min else {
            return Ok(());
        };
        if min.role() != BufferRole::Min {
            return Err(Ps6000aError::validation(format!(
                "buffer {} has role {:?}, expected Min",
                min.id(),
                min.role()
            )));
        }
        if min.class() != max.class() {
            return Err(Ps6000aError::validation(format!(
                "MIN buffer class {} does not match MAX buffer class {}",
                min.class(),
                max.class()
            )));
        }
        if min.mode() != max.mode() {
            return Err(Ps6000aError::validation(format!(
                "MIN buffer mode {:?} does not match MAX buffer mode {:?}",
                min.mode(),
                max.mode()
            )));
        }
        if min.len() != max.len() {
            return Err(Ps6000aError::validation(format!(
                "MIN buffer length {} does not match MAX buffer length {}",
                min.len(),
                max.len()
            )));
        }
        if min == max {
            return Err(Ps6000aError::validation(
                "MAX and MIN must be distinct buffers",
            ));
        }
        Ok(())
    }

    /// Insert a validated pair. With `clear_others` the class is emptied
    /// first. Buffers already present in the class are skipped.
    pub(crate) fn insert(&mut self, max: &Buffer, min: Option<&Buffer>, clear_others: bool) {
        let entry = self.classes.entry(max.class()).or_default();
        if clear_others {
            entry.clear();
        }
        for buffer in std::iter::once(max).chain(min) {
            if !entry.contains(buffer) {
                entry.push(buffer.clone());
            }
        }
    }

    /// Drop every buffer of one class. Returns how many were dropped.
    pub(crate) fn clear_class(&mut self, class: &BufferClass) -> usize {
        self.classes.remove(class).map_or(0, |buffers| buffers.len())
    }

    /// Drop every buffer. Returns how many were dropped.
    pub(crate) fn clear_all(&mut self) -> usize {
        let total = self.total();
        self.classes.clear();
        total
    }

    /// Buffers registered for a class, in registration order.
    pub fn class(&self, class: &BufferClass) -> &[Buffer] {
        self.classes.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every buffer matching the given filters (`None` matches anything).
    pub fn query(
        &self,
        channel: Option<Channel>,
        data_type: Option<DataType>,
        segment: Option<u64>,
    ) -> Vec<Buffer> {
        let mut classes: Vec<&BufferClass> = self
            .classes
            .keys()
            .filter(|c| channel.map_or(true, |ch| c.channel == ch))
            .filter(|c| data_type.map_or(true, |dt| c.data_type == dt))
            .filter(|c| segment.map_or(true, |s| c.segment == s))
            .collect();
        // Stable output regardless of hash order
        classes.sort_by_key(|c| (c.channel.to_raw(), c.data_type.to_raw(), c.segment));
        classes
            .into_iter()
            .flat_map(|c| self.class(c).iter().cloned())
            .collect()
    }

    /// Group a class into `(MAX, MIN?)` pairs by downsampling mode.
    ///
    /// Each MAX buffer takes the first unused MIN buffer of the same mode and
    /// length. MIN buffers left over are returned as orphans.
    pub fn pairs(&self, class: &BufferClass) -> PairSet {
        let buffers = self.class(class);
        let mut mins: Vec<Option<&Buffer>> = buffers
            .iter()
            .filter(|b| b.role() == BufferRole::Min)
            .map(Some)
            .collect();

        let mut pairs = Vec::new();
        for max in buffers.iter().filter(|b| b.role() == BufferRole::Max) {
            let min = mins
                .iter_mut()
                .find(|slot| {
                    slot.is_some_and(|m| m.mode() == max.mode() && m.len() == max.len())
                })
                .and_then(Option::take)
                .cloned();
            pairs.push(BufferPair {
                mode: max.mode(),
                max: max.clone(),
                min,
            });
        }

        let orphans: Vec<Buffer> = mins.into_iter().flatten().cloned().collect();
        PairSet { pairs, orphans }
    }

    /// Segment-0 MAX buffers, one per (channel, data type, mode).
    pub fn streaming_targets(&self) -> Vec<Buffer> {
        let mut seen = Vec::new();
        let mut targets = Vec::new();
        for buffer in self.query(None, None, Some(0)) {
            if buffer.role() != BufferRole::Max {
                continue;
            }
            let key = (buffer.class(), buffer.mode());
            if !seen.contains(&key) {
                seen.push(key);
                targets.push(buffer);
            }
        }
        targets
    }

    /// Number of registered buffers across all classes.
    pub fn total(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }
}

impl<B: DeviceBoundary> Ps6000a<B> {
    fn submit_pair(&mut self, max: &Buffer, min: Option<&Buffer>, action: Action) -> Result<()> {
        let class = max.class();
        let n_samples = i32::try_from(max.len()).map_err(|_| {
            Ps6000aError::validation(format!("buffer length {} exceeds i32", max.len()))
        })?;
        let max_ptr = max.as_mut_ptr();
        let min_ptr = min.map_or(ptr::null_mut(), Buffer::as_mut_ptr);

        // SAFETY: both buffers are kept alive by the registry (or by the
        // caller until insertion) for as long as the device may write them.
        self.call(|b, h| unsafe {
            b.set_data_buffers(
                h,
                class.channel.to_raw(),
                max_ptr,
                min_ptr,
                n_samples,
                class.data_type.to_raw(),
                class.segment,
                max.mode().bits(),
                action.bits(),
            )
        })
    }

    /// Register a MAX buffer, optionally with its MIN partner.
    ///
    /// With `clear_others` the device and the registry forget every other
    /// buffer of the same class first. If the device rejects the call,
    /// neither buffer is registered.
    pub fn set_data_buffers(
        &mut self,
        max: &Buffer,
        min: Option<&Buffer>,
        clear_others: bool,
    ) -> Result<()> {
        BufferRegistry::validate_pair(max, min)?;

        let action = if clear_others {
            Action::CLEAR_ALL | Action::ADD
        } else {
            Action::ADD
        };
        self.submit_pair(max, min, action)?;
        self.registry.insert(max, min, clear_others);

        debug!(
            class = %max.class(),
            mode = ?max.mode(),
            len = max.len(),
            with_min = min.is_some(),
            clear_others,
            "Registered data buffers"
        );
        Ok(())
    }

    /// Allocate and register one zeroed MAX buffer.
    pub fn get_data_buffer(
        &mut self,
        channel: Channel,
        data_type: DataType,
        segment: u64,
        mode: RatioMode,
        len: usize,
        clear_others: bool,
    ) -> Result<Buffer> {
        let class = BufferClass::new(channel, data_type, segment);
        let max = Buffer::new(class, mode, BufferRole::Max, len)?;
        self.set_data_buffers(&max, None, clear_others)?;
        Ok(max)
    }

    /// Allocate and register a zeroed `(MAX, MIN)` pair.
    pub fn get_data_buffers(
        &mut self,
        channel: Channel,
        data_type: DataType,
        segment: u64,
        mode: RatioMode,
        len: usize,
        clear_others: bool,
    ) -> Result<(Buffer, Buffer)> {
        let class = BufferClass::new(channel, data_type, segment);
        let max = Buffer::new(class, mode, BufferRole::Max, len)?;
        let min = Buffer::new(class, mode, BufferRole::Min, len)?;
        self.set_data_buffers(&max, Some(&min), clear_others)?;
        Ok((max, min))
    }

    /// Make the device and the registry forget every buffer of one class.
    pub fn clear_data_buffers(
        &mut self,
        channel: Channel,
        data_type: DataType,
        segment: u64,
    ) -> Result<()> {
        let class = BufferClass::new(channel, data_type, segment);
        self.call(|b, h| unsafe {
            // SAFETY: null buffers with a clear action carry no addresses.
            b.set_data_buffers(
                h,
                channel.to_raw(),
                ptr::null_mut(),
                ptr::null_mut(),
                0,
                data_type.to_raw(),
                segment,
                RatioMode::RAW.bits(),
                Action::CLEAR_ALL.bits(),
            )
        })?;
        let dropped = self.registry.clear_class(&class);
        debug!(%class, dropped, "Cleared data buffers");
        Ok(())
    }

    /// Registered buffers matching the filters. Never mutates the registry.
    pub fn get_all_existing_data_buffers(
        &self,
        channel: Option<Channel>,
        data_type: Option<DataType>,
        segment: Option<u64>,
    ) -> Vec<Buffer> {
        self.registry.query(channel, data_type, segment)
    }

    /// `(MAX, MIN?)` pairs of a class. Orphaned MIN buffers are logged and
    /// returned alongside.
    pub fn get_existing_data_buffer_pairs(
        &self,
        channel: Channel,
        data_type: DataType,
        segment: u64,
    ) -> PairSet {
        let class = BufferClass::new(channel, data_type, segment);
        let set = self.registry.pairs(&class);
        for orphan in &set.orphans {
            warn!(
                %class,
                buffer = orphan.id(),
                mode = ?orphan.mode(),
                "MIN buffer has no matching MAX buffer"
            );
        }
        set
    }

    /// Re-submit every registered pair of a class with `ADD`, without
    /// changing the registry. Used to re-arm streaming after the device
    /// reports its buffers full.
    ///
    /// Returns the re-submitted buffers, each MAX followed by its MIN.
    pub fn reload_data_buffers(
        &mut self,
        channel: Channel,
        data_type: DataType,
        segment: u64,
    ) -> Result<Vec<Buffer>> {
        let set = self.get_existing_data_buffer_pairs(channel, data_type, segment);
        for pair in &set.pairs {
            self.submit_pair(&pair.max, pair.min.as_ref(), Action::ADD)?;
        }
        let reloaded: Vec<Buffer> = set
            .pairs
            .into_iter()
            .flat_map(|p| std::iter::once(p.max).chain(p.min))
            .collect();
        debug!(%channel, %data_type, segment, count = reloaded.len(), "Reloaded data buffers");
        Ok(reloaded)
    }

    /// Number of registered buffers across all classes.
    pub fn total_buffers(&self) -> usize {
        self.registry.total()
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    pub(crate) fn log_registry_summary(&self) {
        info!(total = self.registry.total(), "Registered buffers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(channel: Channel) -> BufferClass {
        BufferClass::new(channel, DataType::Int16, 0)
    }

    fn buf(channel: Channel, mode: RatioMode, role: BufferRole, len: usize) -> Buffer {
        Buffer::new(class(channel), mode, role, len).unwrap()
    }

    #[test]
    fn test_validate_pair_rules() {
        let max = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Max, 100);
        let ok = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Min, 100);
        assert!(BufferRegistry::validate_pair(&max, Some(&ok)).is_ok());

        let short = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Min, 99);
        let other_channel = buf(Channel::B, RatioMode::AGGREGATE, BufferRole::Min, 100);
        let other_mode = buf(Channel::A, RatioMode::RAW, BufferRole::Min, 100);
        let wrong_role = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Max, 100);
        for min in [&short, &other_channel, &other_mode, &wrong_role] {
            assert!(BufferRegistry::validate_pair(&max, Some(min))
                .unwrap_err()
                .is_validation());
        }
        assert!(BufferRegistry::validate_pair(&ok, None).is_err());
    }

    #[test]
    fn test_query_does_not_create_entries() {
        let registry = BufferRegistry::default();
        assert!(registry.query(Some(Channel::C), None, None).is_empty());
        assert!(registry.class(&class(Channel::C)).is_empty());
        assert!(registry.pairs(&class(Channel::C)).pairs.is_empty());
        assert_eq!(registry.classes.len(), 0);
    }

    #[test]
    fn test_insert_and_clear_others() {
        let mut registry = BufferRegistry::default();
        let a1 = buf(Channel::A, RatioMode::RAW, BufferRole::Max, 10);
        let a2 = buf(Channel::A, RatioMode::RAW, BufferRole::Max, 10);
        let b1 = buf(Channel::B, RatioMode::RAW, BufferRole::Max, 10);
        registry.insert(&a1, None, false);
        registry.insert(&b1, None, false);
        registry.insert(&a2, None, true);
        assert_eq!(registry.class(&class(Channel::A)), &[a2]);
        assert_eq!(registry.class(&class(Channel::B)), &[b1]);
        assert_eq!(registry.total(), 2);
    }

    #[test]
    fn test_insert_is_idempotent_per_buffer() {
        let mut registry = BufferRegistry::default();
        let raw = buf(Channel::A, RatioMode::RAW, BufferRole::Max, 10);
        let agg_max = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Max, 10);
        let agg_min = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Min, 10);
        registry.insert(&raw, None, false);
        registry.insert(&agg_max, Some(&agg_min), false);
        registry.insert(&raw, None, false);
        registry.insert(&agg_max, Some(&agg_min), false);

        assert_eq!(
            registry.class(&class(Channel::A)),
            &[raw.clone(), agg_max.clone(), agg_min.clone()]
        );
        assert_eq!(registry.total(), 3);
        assert_eq!(registry.pairs(&class(Channel::A)).pairs.len(), 2);

        // Re-registering with clear_others leaves exactly that buffer
        registry.insert(&raw, None, true);
        assert_eq!(registry.class(&class(Channel::A)), &[raw]);
    }

    #[test]
    fn test_pairs_put_min_in_second_slot() {
        let mut registry = BufferRegistry::default();
        let raw = buf(Channel::A, RatioMode::RAW, BufferRole::Max, 50);
        let agg_max = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Max, 50);
        let agg_min = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Min, 50);
        registry.insert(&raw, None, false);
        registry.insert(&agg_max, Some(&agg_min), false);

        let set = registry.pairs(&class(Channel::A));
        assert!(set.orphans.is_empty());
        assert_eq!(set.pairs.len(), 2);
        assert_eq!(set.pairs[0].max, raw);
        assert_eq!(set.pairs[0].min, None);
        assert_eq!(set.pairs[1].max, agg_max);
        assert_eq!(set.pairs[1].min.as_ref(), Some(&agg_min));
    }

    #[test]
    fn test_unmatched_min_is_orphan() {
        let mut registry = BufferRegistry::default();
        let max = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Max, 50);
        let min = buf(Channel::A, RatioMode::AGGREGATE, BufferRole::Min, 50);
        registry.insert(&max, Some(&min), false);
        // Drop the MAX behind the registry's back
        registry.classes.get_mut(&class(Channel::A)).unwrap().remove(0);

        let set = registry.pairs(&class(Channel::A));
        assert!(set.pairs.is_empty());
        assert_eq!(set.orphans, vec![min]);
    }

    #[test]
    fn test_streaming_targets_segment_zero_max_only() {
        let mut registry = BufferRegistry::default();
        let a = buf(Channel::A, RatioMode::RAW, BufferRole::Max, 10);
        let seg1 = Buffer::new(
            BufferClass::new(Channel::B, DataType::Int16, 1),
            RatioMode::RAW,
            BufferRole::Max,
            10,
        )
        .unwrap();
        let agg_max = buf(Channel::C, RatioMode::AGGREGATE, BufferRole::Max, 10);
        let agg_min = buf(Channel::C, RatioMode::AGGREGATE, BufferRole::Min, 10);
        registry.insert(&a, None, false);
        registry.insert(&seg1, None, false);
        registry.insert(&agg_max, Some(&agg_min), false);

        assert_eq!(registry.streaming_targets(), vec![a, agg_max]);
    }
}

#[cfg(all(test, feature = "mock"))]
mod session_tests {
    use super::*;
    use crate::mock::MockBoundary;
    use crate::status::PicoStatus;
    use crate::types::DeviceResolution;
    use tracing_test::traced_test;

    fn open() -> Ps6000a<MockBoundary> {
        let mut scope = Ps6000a::mock();
        scope.open_unit(None, DeviceResolution::Bits8).unwrap();
        scope
    }

    #[test]
    #[traced_test]
    fn test_orphan_min_is_logged() {
        let mut scope = open();
        let (max, min) = scope
            .get_data_buffers(Channel::A, DataType::Int8, 0, RatioMode::AGGREGATE, 64, false)
            .unwrap();
        let class = max.class();
        scope.registry.classes.get_mut(&class).unwrap().retain(|b| *b != max);

        let set = scope.get_existing_data_buffer_pairs(Channel::A, DataType::Int8, 0);
        assert_eq!(set.orphans, vec![min]);
        assert!(logs_contain("MIN buffer has no matching MAX buffer"));
    }

    #[test]
    fn test_rejected_registration_leaves_registry_unchanged() {
        let mut scope = open();
        scope
            .boundary()
            .fail_next("SetDataBuffers", PicoStatus::INVALID_BUFFER);
        let err = scope
            .get_data_buffer(Channel::B, DataType::Int8, 0, RatioMode::RAW, 32, false)
            .unwrap_err();
        assert_eq!(err.status(), Some(PicoStatus::INVALID_BUFFER));
        assert_eq!(scope.total_buffers(), 0);
    }

    #[test]
    fn test_mismatched_pair_never_reaches_device() {
        let mut scope = open();
        let class = BufferClass::new(Channel::A, DataType::Int8, 0);
        let max = Buffer::new(class, RatioMode::AGGREGATE, BufferRole::Max, 10).unwrap();
        let min = Buffer::new(class, RatioMode::AGGREGATE, BufferRole::Min, 11).unwrap();
        assert!(scope.set_data_buffers(&max, Some(&min), false).unwrap_err().is_validation());
        assert!(scope.boundary().set_data_buffers_calls().is_empty());
        assert_eq!(scope.total_buffers(), 0);
    }
}
