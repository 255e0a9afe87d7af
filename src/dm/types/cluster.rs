/*
 *
 *    Copyright (c) 2020-2022 Project CHIP Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

use core::cell::Cell;

use log::debug;

use crate::error::{Error, ErrorCode};
use crate::tlv::TLVElement;

use super::{
    AcceptedCommandEntry, AttrDetails, AttrId, AttrValueDecoder, AttrValueEncoder, AttributeEntry,
    ClusterId, ClusterPath, ClusterQuality, CmdDetails, CmdId, CmdReply, Dataver, EndptId,
    ListBuilder, Provider,
};

/// The one-way "an attribute changed" notification sink.
///
/// Injected into clusters through the [`ClusterContext`]; every setter
/// that actually changes state fires it. Fire-and-forget: no return
/// value and no guarantee the observer runs synchronously.
pub trait ChangeNotify {
    fn notify(&self, endpoint_id: EndptId, cluster_id: ClusterId, attr_id: AttrId);
}

impl<T> ChangeNotify for &T
where
    T: ChangeNotify,
{
    fn notify(&self, endpoint_id: EndptId, cluster_id: ClusterId, attr_id: AttrId) {
        (**self).notify(endpoint_id, cluster_id, attr_id)
    }
}

impl ChangeNotify for () {
    fn notify(&self, _endpoint_id: EndptId, _cluster_id: ClusterId, _attr_id: AttrId) {
        // No-op
    }
}

/// The capabilities available to a cluster while servicing a lifecycle or
/// dispatch call: the topology query surface and the change notification
/// sink.
///
/// Constructed by the registry and passed into every call; clusters never
/// store it.
#[derive(Copy, Clone)]
pub struct ClusterContext<'a> {
    pub provider: &'a dyn Provider,
    pub notify: &'a dyn ChangeNotify,
}

/// The uniform contract every server cluster implements so the registry
/// can dispatch to all clusters identically.
///
/// One trait object per cluster instance keeps the registry O(1) per
/// cluster at the cost of an internal id switch inside each
/// implementation; that trade-off is deliberate.
///
/// Contract notes:
/// - `read`/`write`/`invoke` are only called while the cluster is active
///   (between `startup` and `shutdown`); the registry guarantees this.
/// - Unknown attribute/command ids must surface as `AttributeNotFound` /
///   `CommandNotFound`, direction mismatches as `UnsupportedRead` /
///   `UnsupportedWrite`. Never panic on a malformed path.
/// - Every state mutation must bump the cluster dataver and fire the
///   change notification.
pub trait ServerCluster {
    /// The concrete path this cluster instance is mounted at.
    fn path(&self) -> ClusterPath;

    /// The live data version of this cluster instance.
    fn dataver(&self) -> u32;

    /// Quality flags of the whole cluster instance.
    fn quality(&self) -> ClusterQuality {
        ClusterQuality::empty()
    }

    /// One-time activation hook, called by the registry upon registration.
    ///
    /// Calling `startup` twice without an intervening `shutdown` is an
    /// error (`InvalidState`) and must not corrupt the instance.
    fn startup(&self, ctx: &ClusterContext<'_>) -> Result<(), Error>;

    /// Releases whatever `startup` acquired; also safe to call when
    /// `startup` failed half-way.
    fn shutdown(&self);

    /// Append the cluster's current attribute metadata, global attributes
    /// included, reflecting the presently enabled optional attributes.
    fn attributes(
        &self,
        ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, AttributeEntry>,
    ) -> Result<(), Error>;

    /// Append the cluster's currently accepted command metadata.
    fn accepted_commands(
        &self,
        ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, AcceptedCommandEntry>,
    ) -> Result<(), Error>;

    /// Append the ids of the data responses this cluster can generate.
    fn generated_commands(
        &self,
        ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, CmdId>,
    ) -> Result<(), Error> {
        let _ = (ctx, builder);

        Ok(())
    }

    /// Read the requested attribute into the provided encoder.
    fn read(
        &self,
        ctx: &ClusterContext<'_>,
        req: &AttrDetails,
        encoder: AttrValueEncoder<'_, '_>,
    ) -> Result<(), Error>;

    /// Write the requested attribute from the provided decoder.
    fn write(
        &self,
        ctx: &ClusterContext<'_>,
        req: &AttrDetails,
        decoder: AttrValueDecoder<'_>,
    ) -> Result<(), Error> {
        let _ = (ctx, decoder);

        debug!("{}::Attr({:#06x})::Write -> unsupported", req.path(), req.attr_id);
        Err(ErrorCode::AttributeNotFound.into())
    }

    /// Invoke the requested command with the provided payload.
    fn invoke(
        &self,
        ctx: &ClusterContext<'_>,
        req: &CmdDetails,
        data: &TLVElement<'_>,
        reply: CmdReply<'_, '_>,
    ) -> Result<(), Error> {
        let _ = (ctx, data, reply);

        debug!("{}::Cmd({:#06x})::Invoke -> unsupported", req.path(), req.cmd_id);
        Err(ErrorCode::CommandNotFound.into())
    }
}

/// The state every cluster implementation embeds: its mount path, its
/// data version and the active flag backing the
/// `{Unregistered} -> {Active} -> {Unregistered}` lifecycle.
///
/// Deliberately a composition helper rather than a base type to inherit
/// from: clusters hold one of these and implement [`ServerCluster`]
/// directly.
pub struct ClusterState {
    path: ClusterPath,
    dataver: Dataver,
    active: Cell<bool>,
}

impl ClusterState {
    pub const fn new(path: ClusterPath, dataver: Dataver) -> Self {
        Self {
            path,
            dataver,
            active: Cell::new(false),
        }
    }

    pub const fn path(&self) -> ClusterPath {
        self.path
    }

    pub fn dataver(&self) -> u32 {
        self.dataver.get()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Enter the active state; errors out if already active.
    pub fn startup(&self) -> Result<(), Error> {
        if self.active.get() {
            return Err(ErrorCode::InvalidState.into());
        }

        self.active.set(true);

        Ok(())
    }

    pub fn shutdown(&self) {
        self.active.set(false);
    }

    /// Record a state mutation: bump the dataver and fire the change
    /// notification for the mutated attribute.
    pub fn data_changed(&self, notify: &dyn ChangeNotify, attr_id: AttrId) {
        self.dataver.changed();
        notify.notify(self.path.endpoint_id, self.path.cluster_id, attr_id);
    }
}

#[cfg(test)]
mod tests {
    use super::ClusterState;
    use crate::dm::{ClusterPath, Dataver};
    use crate::error::ErrorCode;

    #[test]
    fn test_lifecycle() {
        let state = ClusterState::new(
            ClusterPath {
                endpoint_id: 0,
                cluster_id: 1,
            },
            Dataver::new(0),
        );

        assert!(!state.is_active());
        state.startup().unwrap();
        assert!(state.is_active());

        // Double startup is rejected without corrupting the state
        assert_eq!(state.startup().unwrap_err().code(), ErrorCode::InvalidState);
        assert!(state.is_active());

        state.shutdown();
        assert!(!state.is_active());
        state.startup().unwrap();
    }

    #[test]
    fn test_data_changed_bumps_dataver() {
        let state = ClusterState::new(
            ClusterPath {
                endpoint_id: 0,
                cluster_id: 1,
            },
            Dataver::new(41),
        );

        state.data_changed(&(), 3);
        assert_eq!(state.dataver(), 42);
    }
}
