//! Operational command surface.

use log::debug;

use super::Session;
use crate::error::{NetconfError, Result};
use crate::netconf::{escape_text, extract_output, require_nonempty};

impl Session {
    /// Run a free-text operational command (`show ...`) and return its
    /// output.
    ///
    /// The command is wrapped in a `<command format="text">` envelope and
    /// the reply payload unwrapped. A reply with no usable output fails with
    /// [`NetconfError::EmptyOutput`]: Junos answers an operational command
    /// it cannot parse with an empty envelope rather than a diagnostic.
    pub async fn command(&mut self, command: &str) -> Result<String> {
        debug!("command on {}: {}", self.host(), command);
        self.trace(&format!("command: {}", command));

        let body = format!("<command format=\"text\">{}</command>", escape_text(command));
        let reply = self.netconf().execute("command", &body).await?;
        reply.check(&format!("command '{}'", command))?;

        match extract_output(&reply.raw) {
            Some(output) => Ok(output),
            None => Err(NetconfError::EmptyOutput {
                command: command.to_string(),
            }
            .into()),
        }
    }

    /// Execute a raw XML RPC and return the raw reply document unmodified.
    ///
    /// For structured queries (interface listings, route tables, chassis
    /// inventory) prefer the typed accessors; this is the escape hatch for
    /// RPCs the crate has no shape for.
    pub async fn command_xml(&mut self, rpc: &str) -> Result<String> {
        debug!("xml rpc on {}: {}", self.host(), rpc);
        self.trace(&format!("command-xml: {}", rpc));

        let raw = self.netconf().execute_raw(rpc).await?;
        require_nonempty("command-xml", &raw)?;

        let reply = crate::netconf::RpcReply::parse("command-xml", raw)?;
        reply.check("command-xml")?;
        Ok(reply.raw)
    }

    /// Typed system-information query.
    pub async fn system_information(
        &mut self,
    ) -> Result<crate::device::SystemInformationReply> {
        self.fetch().await
    }

    /// Typed terse interface listing.
    pub async fn interfaces_terse(&mut self) -> Result<crate::device::InterfacesTerseReply> {
        self.fetch().await
    }

    /// Typed route-table listing.
    pub async fn route_information(&mut self) -> Result<crate::device::RouteInformationReply> {
        self.fetch().await
    }

    /// Typed chassis inventory.
    pub async fn chassis_inventory(&mut self) -> Result<crate::device::ChassisInventoryReply> {
        self.fetch().await
    }
}
