//! The two credential slots the coordinator reads and writes.

// self
use crate::_prelude::*;

/// Identifies which of the two stored credentials an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	/// Short-lived bearer credential attached to every outbound call.
	Access,
	/// Longer-lived credential used only to mint a new access credential.
	Renewal,
}
impl CredentialKind {
	/// Both kinds, access first.
	pub const ALL: [CredentialKind; 2] = [CredentialKind::Access, CredentialKind::Renewal];

	/// Returns a stable label suitable for log fields and store keys.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::Access => "access",
			CredentialKind::Renewal => "renewal",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
