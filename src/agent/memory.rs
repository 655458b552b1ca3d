use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::Value;

use super::outcome::{StageFailure, StageRecord};
use super::records::{
    AnalysisReport, CitationBatch, Critique, Extraction, Retrieval, SearchStrategy, Synthesis,
    ValidationReport,
};
use super::types::StageKind;

/// One result slot per stage. Each payload type owns exactly one field.
#[derive(Debug, Default, Clone)]
pub struct StageSlots {
    planner: Option<StageRecord<SearchStrategy>>,
    retriever: Option<StageRecord<Retrieval>>,
    extractor: Option<StageRecord<Extraction>>,
    analysis: Option<StageRecord<AnalysisReport>>,
    critic: Option<StageRecord<Critique>>,
    validator: Option<StageRecord<ValidationReport>>,
    references: Option<StageRecord<CitationBatch>>,
    synthesis: Option<StageRecord<Synthesis>>,
}

/// Binds a stage payload type to its slot in [`ResearchMemory`].
pub trait StageOutput: Clone + Send + Sync + 'static {
    const KIND: StageKind;

    fn slot(slots: &StageSlots) -> &Option<StageRecord<Self>>;

    fn slot_mut(slots: &mut StageSlots) -> &mut Option<StageRecord<Self>>;
}

macro_rules! stage_slot {
    ($payload:ty, $kind:ident, $field:ident) => {
        impl StageOutput for $payload {
            const KIND: StageKind = StageKind::$kind;

            fn slot(slots: &StageSlots) -> &Option<StageRecord<Self>> {
                &slots.$field
            }

            fn slot_mut(slots: &mut StageSlots) -> &mut Option<StageRecord<Self>> {
                &mut slots.$field
            }
        }
    };
}

stage_slot!(SearchStrategy, Planner, planner);
stage_slot!(Retrieval, Retriever, retriever);
stage_slot!(Extraction, Extractor, extractor);
stage_slot!(AnalysisReport, Analysis, analysis);
stage_slot!(Critique, Critic, critic);
stage_slot!(ValidationReport, Validator, validator);
stage_slot!(CitationBatch, References, references);
stage_slot!(Synthesis, Synthesis, synthesis);

#[derive(Debug, Default)]
struct ContextState {
    topic: Option<String>,
    strategy: Option<SearchStrategy>,
    values: HashMap<String, Value>,
}

/// Run-scoped store through which stages hand data to each other.
///
/// Shared behind an `Arc`; locks are held only for the duration of a single
/// read or write and never across an await point.
#[derive(Debug, Default)]
pub struct ResearchMemory {
    context: RwLock<ContextState>,
    slots: RwLock<StageSlots>,
}

impl ResearchMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_topic(&self, topic: impl Into<String>) {
        write(&self.context).topic = Some(topic.into());
    }

    pub fn topic(&self) -> Option<String> {
        read(&self.context).topic.clone()
    }

    pub fn store_strategy(&self, strategy: SearchStrategy) {
        write(&self.context).strategy = Some(strategy);
    }

    pub fn strategy(&self) -> Option<SearchStrategy> {
        read(&self.context).strategy.clone()
    }

    /// Free-form context value; last write wins.
    pub fn store_context(&self, key: impl Into<String>, value: Value) {
        write(&self.context).values.insert(key.into(), value);
    }

    #[allow(dead_code)]
    pub fn get_context(&self, key: &str) -> Option<Value> {
        read(&self.context).values.get(key).cloned()
    }

    #[allow(dead_code)]
    pub fn get_context_or(&self, key: &str, default: Value) -> Value {
        self.get_context(key).unwrap_or(default)
    }

    pub fn store_result<T: StageOutput>(&self, record: StageRecord<T>) {
        tracing::trace!(slot = T::KIND.slot_name(), "stage record stored");
        *T::slot_mut(&mut write(&self.slots)) = Some(record);
    }

    pub fn result<T: StageOutput>(&self) -> Option<StageRecord<T>> {
        T::slot(&read(&self.slots)).clone()
    }

    /// Payload of a successful stage. Missing and failed slots both read as `None`.
    pub fn completed<T: StageOutput>(&self) -> Option<T> {
        self.result::<T>().and_then(StageRecord::completed)
    }

    /// Independent copy of every slot and the context, safe to hand to writers.
    pub fn snapshot(&self) -> MemorySnapshot {
        let slots = read(&self.slots).clone();
        let context = read(&self.context);
        MemorySnapshot {
            research_topic: context.topic.clone(),
            search_strategy: context.strategy.clone(),
            context: context.values.clone(),
            planner: slots.planner,
            retriever: slots.retriever,
            extractor: slots.extractor,
            analysis: slots.analysis,
            critic: slots.critic,
            validator: slots.validator,
            references: slots.references,
            synthesis: slots.synthesis,
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Point-in-time copy of the store, keyed by stage slot name when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_strategy: Option<SearchStrategy>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, Value>,
    #[serde(rename = "ResearchPlannerAgent", skip_serializing_if = "Option::is_none")]
    pub planner: Option<StageRecord<SearchStrategy>>,
    #[serde(rename = "PaperRetrieverAgent", skip_serializing_if = "Option::is_none")]
    pub retriever: Option<StageRecord<Retrieval>>,
    #[serde(rename = "ContentExtractorAgent", skip_serializing_if = "Option::is_none")]
    pub extractor: Option<StageRecord<Extraction>>,
    #[serde(rename = "AnalysisAgent", skip_serializing_if = "Option::is_none")]
    pub analysis: Option<StageRecord<AnalysisReport>>,
    #[serde(rename = "CriticAgent", skip_serializing_if = "Option::is_none")]
    pub critic: Option<StageRecord<Critique>>,
    #[serde(rename = "ValidatorAgent", skip_serializing_if = "Option::is_none")]
    pub validator: Option<StageRecord<ValidationReport>>,
    #[serde(rename = "ReferenceManagerAgent", skip_serializing_if = "Option::is_none")]
    pub references: Option<StageRecord<CitationBatch>>,
    #[serde(rename = "SynthesisAgent", skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<StageRecord<Synthesis>>,
}

impl MemorySnapshot {
    /// Failure records left in the slots, in pipeline order.
    pub fn failures(&self) -> Vec<(StageKind, StageFailure)> {
        let failures = [
            self.planner.as_ref().and_then(StageRecord::failure),
            self.retriever.as_ref().and_then(StageRecord::failure),
            self.extractor.as_ref().and_then(StageRecord::failure),
            self.analysis.as_ref().and_then(StageRecord::failure),
            self.critic.as_ref().and_then(StageRecord::failure),
            self.validator.as_ref().and_then(StageRecord::failure),
            self.references.as_ref().and_then(StageRecord::failure),
            self.synthesis.as_ref().and_then(StageRecord::failure),
        ];
        StageKind::ALL
            .into_iter()
            .zip(failures)
            .filter_map(|(kind, failure)| failure.map(|failure| (kind, failure.clone())))
            .collect()
    }

    /// Slot names of stages that left a record, in pipeline order.
    #[cfg(test)]
    pub fn recorded_stages(&self) -> Vec<StageKind> {
        let present = [
            self.planner.is_some(),
            self.retriever.is_some(),
            self.extractor.is_some(),
            self.analysis.is_some(),
            self.critic.is_some(),
            self.validator.is_some(),
            self.references.is_some(),
            self.synthesis.is_some(),
        ];
        StageKind::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(kind, present)| present.then_some(kind))
            .collect()
    }

    pub fn apa_references(&self) -> Vec<String> {
        self.references
            .clone()
            .and_then(StageRecord::completed)
            .map(|batch| batch.apa)
            .unwrap_or_default()
    }
}
