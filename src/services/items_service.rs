use tonic::{Request, Response, Status};

use crate::catalog::image::MAX_IMAGE_BYTES;
use crate::catalog::Catalog;
use crate::middleware::AuthenticatedUser;
use crate::models::{ImageUpload, Item, ItemStatus, ItemType, NewItem};
use crate::proto::common::Empty;
use crate::proto::items::items_service_server::{ItemsService, ItemsServiceServer};
use crate::proto::items::{
    CreateItemReq, CreateItemRes, DeleteItemReq, DeleteItemRes, FindPotentialMatchesReq,
    GetItemReq, GetItemRes, Item as ItemProto, ItemStatus as ItemStatusProto,
    ItemType as ItemTypeProto, ListItemsReq, ListItemsRes, UpdateItemStatusReq,
    UpdateItemStatusRes,
};

/// Largest accepted request: a full-size image plus room for the text fields.
pub const MAX_REQUEST_BYTES: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub struct ItemsServiceImpl {
    catalog: Catalog,
}

impl ItemsServiceImpl {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Wraps the service with a decode limit raised to fit image uploads.
    pub fn into_server(self) -> ItemsServiceServer<Self> {
        ItemsServiceServer::new(self).max_decoding_message_size(MAX_REQUEST_BYTES)
    }

    fn get_authenticated_user<T>(request: &Request<T>) -> Result<AuthenticatedUser, Status> {
        request
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| Status::unauthenticated("Authentication required"))
    }

    fn item_type_from_proto(value: i32) -> Result<ItemType, Status> {
        match ItemTypeProto::try_from(value) {
            Ok(ItemTypeProto::Lost) => Ok(ItemType::Lost),
            Ok(ItemTypeProto::Found) => Ok(ItemType::Found),
            _ => Err(Status::invalid_argument("item_type must be LOST or FOUND")),
        }
    }

    fn status_from_proto(value: i32) -> Result<ItemStatus, Status> {
        match ItemStatusProto::try_from(value) {
            Ok(ItemStatusProto::Searching) => Ok(ItemStatus::Searching),
            Ok(ItemStatusProto::Resolved) => Ok(ItemStatus::Resolved),
            _ => Err(Status::invalid_argument("status must be SEARCHING or RESOLVED")),
        }
    }

    fn model_to_proto(item: &Item) -> ItemProto {
        let item_type = match item.item_type {
            ItemType::Lost => ItemTypeProto::Lost,
            ItemType::Found => ItemTypeProto::Found,
        };
        let status = match item.status {
            ItemStatus::Searching => ItemStatusProto::Searching,
            ItemStatus::Resolved => ItemStatusProto::Resolved,
        };
        ItemProto {
            id: item.id.clone(),
            item_type: item_type.into(),
            name: item.name.clone(),
            category: item.category.clone(),
            location: item.location.clone(),
            date: item.date.clone(),
            description: item.description.clone(),
            image_url: item.image_url.clone(),
            user_id: item.user_id.clone(),
            user_name: item.user_name.clone(),
            contact_info: item.contact_info.clone(),
            status: status.into(),
            created_at: item.created_at.to_rfc3339(),
        }
    }

    fn list_response(items: &[Item]) -> ListItemsRes {
        ListItemsRes {
            items: items.iter().map(Self::model_to_proto).collect(),
        }
    }
}

#[tonic::async_trait]
impl ItemsService for ItemsServiceImpl {
    async fn create_item(
        &self,
        request: Request<CreateItemReq>,
    ) -> Result<Response<CreateItemRes>, Status> {
        let auth_user = Self::get_authenticated_user(&request)?;
        let req = request.into_inner();

        let item_type = Self::item_type_from_proto(req.item_type)?;
        let form = NewItem {
            name: req.name,
            category: req.category,
            location: req.location,
            date: req.date,
            description: req.description,
            contact_info: req.contact_info,
            image: req.image.map(|img| ImageUpload {
                content_type: img.content_type,
                data: img.data,
            }),
        };

        let item = self
            .catalog
            .create_item(form, item_type, &auth_user.user())
            .await?;

        Ok(Response::new(CreateItemRes {
            item: Some(Self::model_to_proto(&item)),
        }))
    }

    async fn list_items(
        &self,
        request: Request<ListItemsReq>,
    ) -> Result<Response<ListItemsRes>, Status> {
        let req = request.into_inner();
        let item_type = Self::item_type_from_proto(req.item_type)?;

        let items = self.catalog.get_items(item_type).await?;
        Ok(Response::new(Self::list_response(&items)))
    }

    async fn get_item(
        &self,
        request: Request<GetItemReq>,
    ) -> Result<Response<GetItemRes>, Status> {
        let req = request.into_inner();

        if req.id.is_empty() {
            return Err(Status::invalid_argument("id is required"));
        }

        match self.catalog.get_item_by_id(&req.id).await? {
            Some(item) => Ok(Response::new(GetItemRes {
                item: Some(Self::model_to_proto(&item)),
            })),
            None => Err(Status::not_found("Item not found")),
        }
    }

    async fn list_my_items(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<ListItemsRes>, Status> {
        let auth_user = Self::get_authenticated_user(&request)?;

        let items = self.catalog.get_user_items(&auth_user.user_id).await?;
        Ok(Response::new(Self::list_response(&items)))
    }

    async fn update_item_status(
        &self,
        request: Request<UpdateItemStatusReq>,
    ) -> Result<Response<UpdateItemStatusRes>, Status> {
        let auth_user = Self::get_authenticated_user(&request)?;
        let req = request.into_inner();

        if req.id.is_empty() {
            return Err(Status::invalid_argument("id is required"));
        }
        let status = Self::status_from_proto(req.status)?;

        match self
            .catalog
            .update_item_status(&auth_user.user(), &req.id, status)
            .await?
        {
            Some(item) => Ok(Response::new(UpdateItemStatusRes {
                item: Some(Self::model_to_proto(&item)),
            })),
            None => Err(Status::not_found("Item not found")),
        }
    }

    async fn delete_item(
        &self,
        request: Request<DeleteItemReq>,
    ) -> Result<Response<DeleteItemRes>, Status> {
        let auth_user = Self::get_authenticated_user(&request)?;
        let req = request.into_inner();

        if req.id.is_empty() {
            return Err(Status::invalid_argument("id is required"));
        }

        let deleted = self.catalog.delete_item(&auth_user.user(), &req.id).await?;
        Ok(Response::new(DeleteItemRes { deleted }))
    }

    async fn find_potential_matches(
        &self,
        request: Request<FindPotentialMatchesReq>,
    ) -> Result<Response<ListItemsRes>, Status> {
        let req = request.into_inner();

        if req.id.is_empty() {
            return Err(Status::invalid_argument("id is required"));
        }

        let matches = self.catalog.find_potential_matches(&req.id).await?;
        Ok(Response::new(Self::list_response(&matches)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use std::sync::Arc;
    use tonic::Code;

    fn service() -> ItemsServiceImpl {
        ItemsServiceImpl::new(Catalog::new(Arc::new(LocalStore::in_memory())))
    }

    fn as_user<T>(mut request: Request<T>, user_id: &str) -> Request<T> {
        request.extensions_mut().insert(AuthenticatedUser {
            user_id: user_id.to_string(),
            email: format!("{}@campus.edu", user_id),
            name: user_id.to_string(),
        });
        request
    }

    fn create_req(item_type: ItemTypeProto, name: &str, category: &str) -> Request<CreateItemReq> {
        Request::new(CreateItemReq {
            item_type: item_type.into(),
            name: name.to_string(),
            category: category.to_string(),
            location: "Student Union".to_string(),
            date: "2024-09-10".to_string(),
            description: String::new(),
            contact_info: "front desk".to_string(),
            image: None,
        })
    }

    async fn create(
        service: &ItemsServiceImpl,
        user: &str,
        t: ItemTypeProto,
        name: &str,
        category: &str,
    ) -> ItemProto {
        service
            .create_item(as_user(create_req(t, name, category), user))
            .await
            .unwrap()
            .into_inner()
            .item
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_requires_authentication() {
        let status = service()
            .create_item(create_req(ItemTypeProto::Lost, "Scarf", "Clothing"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[tokio::test]
    async fn test_create_rejects_unspecified_type() {
        let status = service()
            .create_item(as_user(create_req(ItemTypeProto::Unspecified, "Scarf", "Clothing"), "u1"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let service = service();
        let item = create(&service, "u1", ItemTypeProto::Found, "Scarf", "Clothing").await;
        assert_eq!(item.status, i32::from(ItemStatusProto::Searching));
        assert_eq!(item.user_id, "u1");

        let found = service
            .list_items(Request::new(ListItemsReq {
                item_type: ItemTypeProto::Found.into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(found.items, vec![item]);

        let lost = service
            .list_items(Request::new(ListItemsReq {
                item_type: ItemTypeProto::Lost.into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(lost.items.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_item_is_not_found() {
        let status = service()
            .get_item(Request::new(GetItemReq { id: "nope".to_string() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_status_update_by_non_owner_is_not_found() {
        let service = service();
        let item = create(&service, "u1", ItemTypeProto::Lost, "Laptop", "Electronics").await;

        let req = UpdateItemStatusReq {
            id: item.id.clone(),
            status: ItemStatusProto::Resolved.into(),
        };
        let status = service
            .update_item_status(as_user(Request::new(req.clone()), "u2"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        let updated = service
            .update_item_status(as_user(Request::new(req), "u1"))
            .await
            .unwrap()
            .into_inner()
            .item
            .unwrap();
        assert_eq!(updated.status, i32::from(ItemStatusProto::Resolved));
    }

    #[tokio::test]
    async fn test_delete_reports_outcome() {
        let service = service();
        let item = create(&service, "u1", ItemTypeProto::Lost, "Laptop", "Electronics").await;
        let req = DeleteItemReq { id: item.id.clone() };

        let res = service.delete_item(as_user(Request::new(req.clone()), "u2")).await.unwrap();
        assert!(!res.into_inner().deleted);

        let res = service.delete_item(as_user(Request::new(req), "u1")).await.unwrap();
        assert!(res.into_inner().deleted);
    }

    #[tokio::test]
    async fn test_my_items_lists_lost_then_found() {
        let service = service();
        let found = create(&service, "u1", ItemTypeProto::Found, "Gloves", "Clothing").await;
        let lost = create(&service, "u1", ItemTypeProto::Lost, "Phone", "Electronics").await;
        create(&service, "u2", ItemTypeProto::Lost, "Bike Lock", "Other").await;

        let mine = service
            .list_my_items(as_user(Request::new(Empty {}), "u1"))
            .await
            .unwrap()
            .into_inner();
        let ids: Vec<_> = mine.items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec![lost.id, found.id]);
    }

    #[tokio::test]
    async fn test_find_potential_matches() {
        let service = service();
        let lost = create(&service, "u1", ItemTypeProto::Lost, "Blue Backpack", "Bags").await;
        let purse = create(&service, "u2", ItemTypeProto::Found, "Red Purse", "Bags").await;
        let backpack = create(&service, "u2", ItemTypeProto::Found, "Black Backpack", "Electronics").await;
        create(&service, "u2", ItemTypeProto::Found, "Calculator", "Electronics").await;

        let res = service
            .find_potential_matches(Request::new(FindPotentialMatchesReq { id: lost.id }))
            .await
            .unwrap()
            .into_inner();
        let mut ids: Vec<_> = res.items.into_iter().map(|i| i.id).collect();
        ids.sort();
        let mut expected = vec![purse.id, backpack.id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
