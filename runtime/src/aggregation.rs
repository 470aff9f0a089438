//! Aggregation Engine: one inbound request, several outbound calls, one
//! hypermedia response.
//!
//! | Operation | Outbound calls | Failure contract |
//! |-----------|----------------|------------------|
//! | [`create_composite`](AggregationEngine::create_composite) | probe breeder+pet, POST breeder, POST each pet in order | 404 if a service is down; upstream status otherwise; [`PartialCreation`](CompositeError::PartialCreation) once the breeder exists |
//! | [`list_composites`](AggregationEngine::list_composites) | GET breeders ‖ GET pets | any failure is a 500 with the cause embedded |
//! | [`get_composite`](AggregationEngine::get_composite) | GET breeder, or pub/sub rendezvous | 404 when missing |
//! | [`update_both`](AggregationEngine::update_both) | probe, GET breeder ‖ GET pet, PUT breeder, PUT pet | 404 on failed existence check; upstream status verbatim on update |
//!
//! Nothing is rolled back: this is a best-effort aggregator, not a saga.

use crate::bridge::{PubSubBridge, WorkflowBridge};
use crate::client::ResourceClient;
use crate::config::BreederLookup;
use crate::locator::ServiceLocator;
use composite_core::{
    Breeder, Composite, CompositeError, CompositeFilter, CompositeIn, CompositeResult,
    CompositeUpdate, Customer, Hypermedia, ListResponse, NewPet, Pet, QueryParams, RequestContext,
    Service,
};
use serde_json::Value;

/// A created resource together with its navigation headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<T> {
    /// Value of the `Location` header
    pub location: String,
    /// Value of the `Link` header
    pub link_header: String,
    /// Response body
    pub body: T,
}

/// Orchestrates calls to the breeder and pet services.
#[derive(Clone, Debug)]
pub struct AggregationEngine {
    locator: ServiceLocator,
    breeders: ResourceClient,
    pets: ResourceClient,
    links: Hypermedia,
    lookup: BreederLookup,
    pubsub: Option<PubSubBridge>,
    workflow: Option<WorkflowBridge>,
}

impl AggregationEngine {
    /// Engine with direct breeder lookup and no asynchronous bridges.
    #[must_use]
    pub const fn new(
        locator: ServiceLocator,
        breeders: ResourceClient,
        pets: ResourceClient,
        links: Hypermedia,
    ) -> Self {
        Self {
            locator,
            breeders,
            pets,
            links,
            lookup: BreederLookup::Direct,
            pubsub: None,
            workflow: None,
        }
    }

    /// Attach the pub/sub bridge and choose how `get_composite` looks up.
    #[must_use]
    pub fn with_pubsub(mut self, bridge: PubSubBridge, lookup: BreederLookup) -> Self {
        self.pubsub = Some(bridge);
        self.lookup = lookup;
        self
    }

    /// Attach the workflow bridge used for customer lookups.
    #[must_use]
    pub fn with_workflow(mut self, bridge: WorkflowBridge) -> Self {
        self.workflow = Some(bridge);
        self
    }

    /// Create a breeder and its pets.
    ///
    /// Pets are created one after another, in submission order, each carrying
    /// the new breeder's id. The first pet failure stops the remaining ones.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::Validation`] for malformed input (nothing is sent)
    /// - [`CompositeError::ServiceUnavailable`] when a probe fails
    /// - the breeder service's error when breeder creation fails
    /// - [`CompositeError::PartialCreation`] when a pet fails after the breeder exists
    pub async fn create_composite(
        &self,
        input: CompositeIn,
        ctx: &RequestContext,
    ) -> CompositeResult<Created<Composite>> {
        input.validate()?;
        self.locator
            .ensure_available(&[Service::Breeder, Service::Pet])
            .await?;

        let breeder: Breeder = self.breeders.post("", &input.breeder, ctx).await?;
        tracing::info!(
            breeder_id = %breeder.id,
            pets = input.pets.len(),
            correlation_id = %ctx.correlation_id(),
            "Breeder created"
        );

        let mut created = Vec::with_capacity(input.pets.len());
        for (index, attributes) in input.pets.into_iter().enumerate() {
            let body = NewPet::new(attributes, breeder.id.clone());
            match self.pets.post::<_, Pet>("", &body, ctx).await {
                Ok(pet) => created.push(pet),
                Err(source) => {
                    tracing::warn!(
                        breeder_id = %breeder.id,
                        failed_index = index,
                        created = created.len(),
                        error = %source,
                        "Pet creation failed; breeder is kept"
                    );
                    return Err(CompositeError::PartialCreation {
                        breeder_id: breeder.id,
                        created_pets: created,
                        failed_index: index,
                        source: Box::new(source),
                    });
                }
            }
        }

        let self_href = self.links.composite_href(&breeder.id);
        Ok(Created {
            link_header: self.links.link_header(&self_href),
            body: Composite {
                breeders: ListResponse::new(vec![breeder], self.links.collection_links()),
                pets: ListResponse::new(created, self.links.collection_links()),
                links: self.links.entity_links(self_href.clone()),
            },
            location: self_href,
        })
    }

    /// List breeders and pets, filtered independently.
    ///
    /// # Errors
    ///
    /// [`CompositeError::Validation`] for out-of-range limits; any upstream
    /// failure becomes [`CompositeError::Internal`] carrying its message.
    pub async fn list_composites(
        &self,
        filter: &CompositeFilter,
        ctx: &RequestContext,
    ) -> CompositeResult<Composite> {
        filter.validate()?;

        let breeder_query = filter.breeder_query();
        let pet_query = filter.pet_query();
        let (breeders, pets) = tokio::try_join!(
            self.breeders
                .get::<ListResponse<Breeder>>("", &breeder_query, ctx),
            self.pets.get::<ListResponse<Pet>>("", &pet_query, ctx),
        )
        .map_err(|e| CompositeError::Internal(format!("Failed to list composites: {e}")))?;

        Ok(Composite {
            breeders: ListResponse::new(breeders.data, self.links.collection_links()),
            pets: ListResponse::new(pets.data, self.links.collection_links()),
            links: self.links.collection_links(),
        })
    }

    /// Fetch one breeder through the configured lookup mechanism.
    ///
    /// # Errors
    ///
    /// [`CompositeError::NotFound`] when the breeder does not exist, plus
    /// whatever the lookup mechanism raises.
    pub async fn get_composite(
        &self,
        breeder_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Breeder> {
        let mut breeder = match self.lookup {
            BreederLookup::Direct => self
                .breeders
                .get_optional::<Breeder>(&ResourceClient::item(breeder_id), ctx)
                .await?
                .ok_or_else(|| CompositeError::not_found("Breeder", breeder_id))?,
            BreederLookup::PubSub => self.rendezvous_breeder(breeder_id, ctx).await?,
        };
        breeder.links = self
            .links
            .entity_links(self.links.composite_href(breeder_id));
        Ok(breeder)
    }

    /// Fetch one breeder through the pub/sub rendezvous, whatever the lookup mode.
    ///
    /// # Errors
    ///
    /// Rendezvous failures (504 timeout, 404, 500) and decode failures.
    pub async fn breeder_via_pubsub(
        &self,
        breeder_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Breeder> {
        let mut breeder = self.rendezvous_breeder(breeder_id, ctx).await?;
        breeder.links = self
            .links
            .entity_links(self.links.breeder_lookup_href(breeder_id));
        Ok(breeder)
    }

    /// Fetch one customer through the workflow engine.
    ///
    /// # Errors
    ///
    /// Workflow failures (408 timeout, 404, 500) and decode failures.
    pub async fn customer_via_workflow(
        &self,
        customer_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Customer> {
        let bridge = self
            .workflow
            .as_ref()
            .ok_or_else(|| CompositeError::Internal("Workflow lookup is not configured".into()))?;
        let data = bridge.lookup_customer(customer_id, ctx).await?;
        let mut customer: Customer = decode(data, "customer workflow result")?;
        customer.links = self
            .links
            .entity_links(self.links.customer_lookup_href(customer_id));
        Ok(customer)
    }

    /// Apply partial updates to a breeder and one pet.
    ///
    /// Only fields present in `update` are sent; an absent or empty
    /// sub-document leaves that service untouched.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::NotFound`] naming the missing resource
    /// - the upstream status, verbatim, when an update call fails
    pub async fn update_both(
        &self,
        breeder_id: &str,
        pet_id: &str,
        update: &CompositeUpdate,
        ctx: &RequestContext,
    ) -> CompositeResult<Composite> {
        update.validate()?;
        self.locator
            .ensure_available(&[Service::Breeder, Service::Pet])
            .await?;

        let breeder_path = ResourceClient::item(breeder_id);
        let pet_path = ResourceClient::item(pet_id);
        let no_query = QueryParams::default();

        let (breeder, pet) = tokio::join!(
            self.breeders.get::<Breeder>(&breeder_path, &no_query, ctx),
            self.pets.get::<Pet>(&pet_path, &no_query, ctx),
        );
        let breeder = breeder.map_err(|e| existence_error(e, "Breeder", breeder_id))?;
        let pet = pet.map_err(|e| existence_error(e, "Pet", pet_id))?;

        let breeder = match update.breeder_changes() {
            Some(changes) => self.breeders.put(&breeder_path, changes, ctx).await?,
            None => breeder,
        };
        let pet = match update.pet_changes() {
            Some(changes) => self.pets.put(&pet_path, changes, ctx).await?,
            None => pet,
        };

        tracing::info!(
            breeder_id,
            pet_id,
            breeder_updated = update.breeder_changes().is_some(),
            pet_updated = update.pet_changes().is_some(),
            "Composite updated"
        );

        Ok(Composite {
            breeders: ListResponse::new(vec![breeder], self.links.collection_links()),
            pets: ListResponse::new(vec![pet], self.links.collection_links()),
            links: self
                .links
                .entity_links(self.links.pet_href(breeder_id, pet_id)),
        })
    }

    async fn rendezvous_breeder(
        &self,
        breeder_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<Breeder> {
        let bridge = self
            .pubsub
            .as_ref()
            .ok_or_else(|| CompositeError::Internal("Pub/sub lookup is not configured".into()))?;
        let data = bridge.lookup_breeder(breeder_id, ctx).await?;
        decode(data, "pub/sub breeder reply")
    }
}

/// Any upstream answer to an existence check other than 200 means "missing".
fn existence_error(error: CompositeError, resource: &'static str, id: &str) -> CompositeError {
    match error {
        CompositeError::Upstream { .. } => CompositeError::not_found(resource, id),
        other => other,
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value, context: &str) -> CompositeResult<T> {
    serde_json::from_value(data).map_err(|e| CompositeError::decode(context, e))
}
