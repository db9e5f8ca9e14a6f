use std::sync::Arc;

use crate::converter::SchemaTreeBuilder;
use crate::core::MapperConfig;
use crate::error::{MappingError, Result};
use crate::mapping::{AnswerExtractor, Context, ContextResolver, InstancePopulator};
use crate::path::{FhirPathEvaluator, PathEvaluator};
use crate::provider::{
    CacheStats, CompositeSnapshotProvider, DerivedSnapshotProvider, SchemaCache, SnapshotProvider,
};
use crate::types::answer::{AnswerRoot, AnswerTemplate};
use crate::types::descriptor::TypeDescriptorProvider;
use crate::types::registry::TypeRegistry;
use crate::types::schema::SchemaNode;
use crate::types::value::FhirValue;
use crate::validation::{ValidationOutcome, ValidationWalker};

/// Entry point tying the tree builder to the three consuming operations.
pub struct SchemaMapper {
    builder: SchemaTreeBuilder,
    evaluator: Arc<dyn PathEvaluator>,
    walker: ValidationWalker,
    populator: InstancePopulator,
    config: MapperConfig,
}

impl SchemaMapper {
    pub fn new(
        config: MapperConfig,
        snapshots: Arc<dyn SnapshotProvider>,
        types: Arc<dyn TypeDescriptorProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let evaluator: Arc<dyn PathEvaluator> = Arc::new(FhirPathEvaluator::new(Arc::clone(&types)));
        let walker = ValidationWalker::new(Arc::clone(&evaluator), Arc::clone(&types));
        let builder = SchemaTreeBuilder::new(snapshots, types).with_config(config.clone());

        Ok(Self {
            builder,
            evaluator,
            walker,
            populator: InstancePopulator::new(),
            config,
        })
    }

    /// Mapper over R4 types. `profiles` is consulted first; core data types
    /// and resources fall back to definitions derived from the descriptors.
    pub fn r4(config: MapperConfig, profiles: Arc<dyn SnapshotProvider>) -> Result<Self> {
        let types: Arc<dyn TypeDescriptorProvider> = TypeRegistry::r4();
        let core = DerivedSnapshotProvider::new(Arc::clone(&types), config.core_profile_base.clone());
        let snapshots = CompositeSnapshotProvider::new()
            .with_provider(profiles)
            .with_provider(Arc::new(core));
        Self::new(config, Arc::new(snapshots), types)
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn PathEvaluator>) -> Self {
        self.walker = ValidationWalker::new(Arc::clone(&evaluator), Arc::clone(self.builder.types()));
        self.evaluator = evaluator;
        self
    }

    /// Shares a schema cache with other mappers.
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.builder = self.builder.with_cache(cache);
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn builder(&self) -> &SchemaTreeBuilder {
        &self.builder
    }

    pub fn evaluator(&self) -> &Arc<dyn PathEvaluator> {
        &self.evaluator
    }

    /// `None` when the profile cannot be resolved.
    pub fn build_schema(&self, profile_id: &str) -> Result<Option<Arc<SchemaNode>>> {
        self.builder.build(profile_id)
    }

    pub fn populate(&self, schema: &SchemaNode, answers: &AnswerRoot) -> Result<FhirValue> {
        self.populator.populate(schema, answers)
    }

    pub fn populate_as<T>(&self, schema: &SchemaNode, answers: &AnswerRoot) -> Result<T>
    where
        T: TryFrom<FhirValue>,
    {
        let instance = self.populate(schema, answers)?;
        T::try_from(instance).map_err(|_| MappingError::uninstantiable(std::any::type_name::<T>()))
    }

    pub fn extract_answers(
        &self,
        schema: Arc<SchemaNode>,
        instance: &FhirValue,
        template: &AnswerTemplate,
    ) -> Result<AnswerRoot> {
        self.extract_answers_from_set(schema, instance, std::slice::from_ref(instance), template)
    }

    /// Extraction where profile-level `definition`s may switch to other
    /// instances in `working_set`.
    pub fn extract_answers_from_set(
        &self,
        schema: Arc<SchemaNode>,
        instance: &FhirValue,
        working_set: &[FhirValue],
        template: &AnswerTemplate,
    ) -> Result<AnswerRoot> {
        let context = Context::new(schema, instance.clone(), working_set);
        AnswerExtractor::new(ContextResolver::new(&self.builder)).extract(&context, template)
    }

    pub fn validate(&self, schema: &SchemaNode, instance: &FhirValue) -> Result<ValidationOutcome> {
        self.walker.validate(schema, instance)
    }

    /// Validates and applies the configured policy.
    pub fn is_valid(&self, schema: &SchemaNode, instance: &FhirValue) -> Result<bool> {
        Ok(self.validate(schema, instance)?.is_success(&self.config.validation))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.builder.cache().stats()
    }

    pub fn flush_cache(&self) {
        self.builder.cache().flush();
    }
}
