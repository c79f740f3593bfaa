mod group_detail;
mod group_list;
mod member_list;
mod publication_detail;
mod publication_list;
mod request_list;

pub use group_detail::GroupDetailView;
pub use group_list::{GroupListView, GroupScope};
pub use member_list::MemberListView;
pub use publication_detail::PublicationDetailView;
pub use publication_list::{PublicationListView, PublicationScope};
pub use request_list::RequestListView;
